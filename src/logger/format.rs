//! Access log format module
//!
//! Formats one line per completed request in Common Log Format (CLF).

use chrono::Local;

/// Access log entry containing request/response information
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    /// Request timestamp
    pub time: chrono::DateTime<Local>,
    /// HTTP method (GET, POST, etc.)
    pub method: String,
    /// Request URI path
    pub path: String,
    /// Response status code
    pub status: u16,
    /// Response body size in bytes
    pub body_bytes: usize,
}

impl AccessLogEntry {
    /// Create a new access log entry with current timestamp
    #[must_use]
    pub fn new(method: String, path: String) -> Self {
        Self {
            time: Local::now(),
            method,
            path,
            status: 200,
            body_bytes: 0,
        }
    }

    /// Common Log Format (CLF)
    /// `- - - [$time_local] "$request" $status $body_bytes_sent`
    #[must_use]
    pub fn format_common(&self) -> String {
        format!(
            "- - - [{}] \"{} {} HTTP/1.1\" {} {}",
            self.time.format("%d/%b/%Y:%H:%M:%S %z"),
            self.method,
            self.path,
            self.status,
            self.body_bytes,
        )
    }
}
