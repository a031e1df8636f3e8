//! Logger module
//!
//! Provides logging utilities for the HTTP server: server lifecycle
//! messages, per-request access logging, and error/warning output.

mod format;

pub use format::AccessLogEntry;

use crate::config::Config;
use hyper::Method;
use std::net::SocketAddr;

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    println!("======================================");
    println!("Async server started successfully");
    println!("Listening on: http://{addr}");
    println!("Log level: {}", config.logging.level);
    println!("Static directory: {}", config.resources.static_dir);
    if let Some(workers) = config.server.workers {
        println!("Worker threads: {workers}");
    }
    println!("Using Tokio runtime for concurrency");
    println!("======================================\n");
}

pub fn log_server_ready(pid: u32, addr: &SocketAddr) {
    println!("Server with process ID {pid} is running at http://{addr}");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    println!("[Connection] Accepted from: {peer_addr}");
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    eprintln!("[ERROR] Failed to serve connection: {err:?}");
}

pub fn log_request(method: &Method, path: &str) {
    println!("[Request] {method} {path}");
}

pub fn log_route_registered(method: &str, path: &str) {
    println!("Registering route [{method} {path}]");
}

pub fn log_headers_count(count: usize, show: bool) {
    if show {
        println!("[Headers] Count: {count}");
    }
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry) {
    println!("{}", entry.format_common());
}

pub fn log_warning(message: &str) {
    eprintln!("[WARN] {message}");
}

pub fn log_error(message: &str) {
    eprintln!("[ERROR] {message}");
}
