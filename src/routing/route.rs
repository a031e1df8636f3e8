//! Route module
//!
//! A route owns, per HTTP method, an ordered middleware chain. Dispatch is
//! a direct method-indexed lookup; a method that was never registered runs
//! a shared terminal handler answering 404.

use crate::http::{RequestContext, ResponseSink};
use crate::logger;
use crate::routing::chain::{self, middleware, ChainRun, Middleware};
use hyper::Method;
use std::sync::Arc;

const GET: usize = 0;
const POST: usize = 1;
const PUT: usize = 2;
const DELETE: usize = 3;

const METHOD_NAMES: [&str; 4] = ["GET", "POST", "PUT", "DELETE"];

fn method_slot(method: &Method) -> Option<usize> {
    if *method == Method::GET {
        Some(GET)
    } else if *method == Method::POST {
        Some(POST)
    } else if *method == Method::PUT {
        Some(PUT)
    } else if *method == Method::DELETE {
        Some(DELETE)
    } else {
        None
    }
}

/// Terminal handler for methods with no registered chain
fn not_found_chain() -> Arc<[Middleware]> {
    let handler = middleware(|request, sink, _advance| async move {
        sink.write_head(404, &[("Content-Type", "text/plain")])?;
        sink.write(format!("Path {} {} not found.", request.method, request.path).as_bytes())?;
        sink.end()?;
        Ok(())
    });
    Arc::from(vec![handler])
}

/// One registered route: a path plus an optional middleware chain per
/// supported method. Configured once at startup, read-only afterwards.
pub struct Route {
    path: String,
    chains: [Option<Arc<[Middleware]>>; 4],
    not_found: Arc<[Middleware]>,
}

impl Route {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            chains: [None, None, None, None],
            not_found: not_found_chain(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Register the GET chain, replacing any previous one
    #[must_use]
    pub fn get(self, chain: impl IntoIterator<Item = Middleware>) -> Self {
        self.register(GET, chain)
    }

    /// Register the POST chain, replacing any previous one
    #[must_use]
    pub fn post(self, chain: impl IntoIterator<Item = Middleware>) -> Self {
        self.register(POST, chain)
    }

    /// Register the PUT chain, replacing any previous one
    #[must_use]
    pub fn put(self, chain: impl IntoIterator<Item = Middleware>) -> Self {
        self.register(PUT, chain)
    }

    /// Register the DELETE chain, replacing any previous one
    #[must_use]
    pub fn delete(self, chain: impl IntoIterator<Item = Middleware>) -> Self {
        self.register(DELETE, chain)
    }

    fn register(mut self, slot: usize, chain: impl IntoIterator<Item = Middleware>) -> Self {
        logger::log_route_registered(METHOD_NAMES[slot], &self.path);
        let collected: Vec<Middleware> = chain.into_iter().collect();
        self.chains[slot] = Some(Arc::from(collected));
        self
    }

    /// Run the chain registered for `method`, or the shared 404 terminal
    /// handler if none was registered. Each call gets its own cursor, so
    /// concurrent dispatches against the same route never interfere.
    pub fn dispatch(
        &self,
        method: &Method,
        request: Arc<RequestContext>,
        sink: Arc<ResponseSink>,
    ) -> ChainRun {
        let selected = method_slot(method)
            .and_then(|slot| self.chains[slot].clone())
            .unwrap_or_else(|| Arc::clone(&self.not_found));
        chain::run(selected, request, sink)
    }
}
