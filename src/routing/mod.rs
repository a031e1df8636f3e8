// Routing module entry point
// Per-route middleware chains and the executor that drives them

pub mod chain;
pub mod route;

// Re-export the registration and dispatch surface
pub use chain::{middleware, Advance, ChainRun, HandlerError, Middleware};
pub use route::Route;
