//! Response sink module
//!
//! Per-request write target with an explicit termination contract:
//! headers may be set any number of times before the first body write, the
//! body may be written incrementally, and the response is terminated
//! exactly once. Violations surface as errors instead of being silently
//! tolerated.

use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tokio::sync::Notify;

/// Sink contract violation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkError {
    /// The response was already terminated with `end`
    Ended,
    /// The status line and headers were already sent
    HeadSent,
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ended => write!(f, "response already terminated"),
            Self::HeadSent => write!(f, "response headers already sent"),
        }
    }
}

impl std::error::Error for SinkError {}

#[derive(Debug, Default)]
struct SinkState {
    status: Option<u16>,
    // Insertion-ordered so "first header set" is observable
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    started: bool,
    ended: bool,
}

impl SinkState {
    fn set_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(existing) => existing.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }
}

/// Per-request response write target
#[derive(Debug, Default)]
pub struct ResponseSink {
    state: Mutex<SinkState>,
    done: Notify,
}

impl ResponseSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set (or replace) a header. Allowed any number of times before the
    /// head or first body write goes out.
    pub fn set_header(&self, name: &str, value: &str) -> Result<(), SinkError> {
        let mut state = self.lock();
        if state.ended {
            return Err(SinkError::Ended);
        }
        if state.started {
            return Err(SinkError::HeadSent);
        }
        state.set_header(name, value);
        Ok(())
    }

    /// Send the status line together with additional headers
    pub fn write_head(&self, status: u16, headers: &[(&str, &str)]) -> Result<(), SinkError> {
        let mut state = self.lock();
        if state.ended {
            return Err(SinkError::Ended);
        }
        if state.started {
            return Err(SinkError::HeadSent);
        }
        state.status = Some(status);
        for (name, value) in headers {
            state.set_header(name, value);
        }
        state.started = true;
        Ok(())
    }

    /// Append a chunk to the response body
    pub fn write(&self, chunk: &[u8]) -> Result<(), SinkError> {
        let mut state = self.lock();
        if state.ended {
            return Err(SinkError::Ended);
        }
        state.started = true;
        state.body.extend_from_slice(chunk);
        Ok(())
    }

    /// Terminate the response. Valid exactly once.
    pub fn end(&self) -> Result<(), SinkError> {
        {
            let mut state = self.lock();
            if state.ended {
                return Err(SinkError::Ended);
            }
            state.ended = true;
        }
        self.done.notify_waiters();
        Ok(())
    }

    /// Whether the head or any body chunk has gone out
    #[must_use]
    pub fn has_started(&self) -> bool {
        self.lock().started
    }

    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.lock().ended
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.lock().status
    }

    /// Snapshot of the headers in insertion order
    #[must_use]
    pub fn headers(&self) -> Vec<(String, String)> {
        self.lock().headers.clone()
    }

    /// Snapshot of the body written so far
    #[must_use]
    pub fn body(&self) -> Bytes {
        Bytes::from(self.lock().body.clone())
    }

    /// Resolve once `end` has been called
    pub async fn finished(&self) {
        loop {
            // Register before checking the flag so a concurrent `end`
            // between check and await cannot be missed
            let notified = self.done.notified();
            if self.is_ended() {
                return;
            }
            notified.await;
        }
    }

    /// Convert the terminated sink into a transport response.
    /// An unset status defaults to 200.
    #[must_use]
    pub fn to_response(&self) -> Response<Full<Bytes>> {
        let state = self.lock();
        let mut builder = Response::builder().status(state.status.unwrap_or(200));
        for (name, value) in &state.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
            .body(Full::new(Bytes::from(state.body.clone())))
            .unwrap_or_else(|e| {
                logger::log_error(&format!("Failed to build response: {e}"));
                let mut fallback = Response::new(Full::new(Bytes::new()));
                *fallback.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
                fallback
            })
    }
}
