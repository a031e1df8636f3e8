//! Middleware chain executor
//!
//! Runs an ordered list of middleware as one asynchronous pipeline. Every
//! invocation gets a fresh scheduler turn (a spawned task), so a handler
//! that panics or never advances cannot corrupt a sibling invocation or
//! grow the stack with chain length. Progress is tracked by a cursor
//! allocated per dispatch call and never shared across requests.

use crate::http::{RequestContext, ResponseSink};
use crate::logger;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Error a middleware may surface instead of writing a response
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Boxed future returned by a middleware invocation
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send>>;

/// A middleware: invoked with the request, the response sink, and a
/// continuation it may call to advance the chain
pub type Middleware =
    Arc<dyn Fn(Arc<RequestContext>, Arc<ResponseSink>, Advance) -> HandlerFuture + Send + Sync>;

/// Wrap an async closure as a [`Middleware`]
pub fn middleware<F, Fut>(handler: F) -> Middleware
where
    F: Fn(Arc<RequestContext>, Arc<ResponseSink>, Advance) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    Arc::new(move |request, sink, advance| Box::pin(handler(request, sink, advance)))
}

/// Per-dispatch progress: how many middleware have run and whether the
/// chain has finished (ran off the end or was halted by a fault)
#[derive(Debug)]
struct ChainCursor {
    position: AtomicUsize,
    completed: AtomicBool,
    done: Notify,
}

impl ChainCursor {
    fn new() -> Self {
        Self {
            position: AtomicUsize::new(0),
            completed: AtomicBool::new(false),
            done: Notify::new(),
        }
    }
}

/// Everything one dispatch call owns; kept alive by the tasks it spawns
struct DispatchState {
    chain: Arc<[Middleware]>,
    cursor: ChainCursor,
    request: Arc<RequestContext>,
    sink: Arc<ResponseSink>,
}

/// Continuation handed to one middleware invocation.
///
/// Advancing moves the cursor past this invocation's own position, so a
/// second call (or a call after the chain has moved on) is ignored.
pub struct Advance {
    state: Arc<DispatchState>,
    from: usize,
}

impl Advance {
    /// Run the next middleware on a fresh scheduler turn, or mark the
    /// chain completed if this was the last one
    pub fn advance(&self) {
        let cursor = &self.state.cursor;
        if cursor.completed.load(Ordering::Acquire) {
            return;
        }
        if cursor
            .position
            .compare_exchange(self.from, self.from + 1, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // Stale continuation: this invocation already advanced, or the
            // chain moved past it
            return;
        }
        let next = self.from + 1;
        if next >= self.state.chain.len() {
            complete(&self.state);
            return;
        }
        schedule(Arc::clone(&self.state), next);
    }
}

/// Observable handle for one dispatch call.
///
/// Dropping the handle while the response has not terminated halts the
/// chain: an abandoned dispatch (client disconnect, connection timeout)
/// must not keep scheduling middleware. Hold it until the sink finishes.
pub struct ChainRun {
    state: Arc<DispatchState>,
}

impl Drop for ChainRun {
    fn drop(&mut self) {
        if !self.state.sink.is_ended() && !self.is_complete() {
            complete(&self.state);
        }
    }
}

impl ChainRun {
    /// Number of middleware the cursor has advanced past
    #[must_use]
    pub fn position(&self) -> usize {
        self.state.cursor.position.load(Ordering::Acquire)
    }

    /// Whether the chain ran off the end or was halted
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state.cursor.completed.load(Ordering::Acquire)
    }

    /// Resolve once the chain completes. A chain stopped by a terminal
    /// handler that never advances does not complete; await the sink for
    /// that case.
    pub async fn completed(&self) {
        loop {
            let notified = self.state.cursor.done.notified();
            if self.is_complete() {
                return;
            }
            notified.await;
        }
    }
}

/// Begin executing `chain` for one request. The first middleware runs on
/// a fresh scheduler turn; an empty chain completes immediately.
pub fn run(
    chain: Arc<[Middleware]>,
    request: Arc<RequestContext>,
    sink: Arc<ResponseSink>,
) -> ChainRun {
    let state = Arc::new(DispatchState {
        chain,
        cursor: ChainCursor::new(),
        request,
        sink,
    });
    if state.chain.is_empty() {
        complete(&state);
    } else {
        schedule(Arc::clone(&state), 0);
    }
    ChainRun { state }
}

fn complete(state: &DispatchState) {
    state.cursor.completed.store(true, Ordering::Release);
    state.cursor.done.notify_waiters();
}

/// Spawn one middleware invocation and supervise it: an `Err` return or a
/// panic is contained here instead of propagating into the runtime
fn schedule(state: Arc<DispatchState>, index: usize) {
    tokio::spawn(async move {
        let handler = Arc::clone(&state.chain[index]);
        let request = Arc::clone(&state.request);
        let sink = Arc::clone(&state.sink);
        let advance = Advance {
            state: Arc::clone(&state),
            from: index,
        };
        let turn = tokio::spawn(async move { handler(request, sink, advance).await });
        match turn.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => fault(&state, index, &err.to_string()),
            Err(join_err) if join_err.is_panic() => fault(&state, index, "handler panicked"),
            Err(_) => {} // cancelled at shutdown
        }
    });
}

/// Contain a middleware fault: answer 500 if the response has not
/// started, otherwise log only, and halt the chain
fn fault(state: &DispatchState, index: usize, detail: &str) {
    logger::log_error(&format!(
        "Middleware {index} failed for {} {}: {detail}",
        state.request.method, state.request.path
    ));
    if state.cursor.position.load(Ordering::Acquire) != index {
        // The handler advanced before failing; its successor owns the
        // response now, so the failure is only logged
        return;
    }
    complete(state);
    if !state.sink.has_started() {
        if let Err(err) = respond_server_error(&state.sink) {
            logger::log_warning(&format!("Could not write error response: {err}"));
        }
    }
}

fn respond_server_error(sink: &ResponseSink) -> Result<(), crate::http::SinkError> {
    sink.write_head(500, &[("Content-Type", "text/plain")])?;
    sink.write(b"Internal Server Error")?;
    sink.end()
}
