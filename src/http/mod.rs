//! HTTP protocol layer module
//!
//! Request/response primitives decoupled from routing and business logic.

pub mod mime;
pub mod request;
pub mod sink;

// Re-export commonly used types
pub use request::{RequestBody, RequestContext};
pub use sink::{ResponseSink, SinkError};
