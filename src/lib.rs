//! Minimal asynchronous HTTP router with per-method middleware chains.
//!
//! Each registered route owns an ordered middleware chain per HTTP method;
//! a chain executor runs the handlers one scheduler turn at a time, and
//! unmatched paths fall back to static file serving.

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod routing;
pub mod server;
