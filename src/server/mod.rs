// Server module entry point
// Owns the routing table and global policy, accepts connections, and
// forwards requests to the dispatch pipeline

mod connection;
mod listener;

use crate::config::Config;
use crate::handler::static_files;
use crate::logger;
use crate::routing::{middleware, Middleware, Route};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

/// Read-only view of the server used while serving requests. Built once
/// when the server starts; never mutated afterwards.
pub struct ServerState {
    pub config: Config,
    pub router: HashMap<String, Arc<Route>>,
    pub allow_cors: bool,
    pub static_root: PathBuf,
}

/// The dispatcher: routing table plus global policy flags. Configure at
/// startup, then `start` consumes it and begins serving.
pub struct Server {
    config: Config,
    router: HashMap<String, Arc<Route>>,
    allow_cors: bool,
    static_root: PathBuf,
}

impl Server {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let allow_cors = config.http.allow_cors;
        let static_root = PathBuf::from(&config.resources.static_dir);
        Self {
            config,
            router: HashMap::new(),
            allow_cors,
            static_root,
        }
    }

    /// Insert a route, overwriting any previous registration for its path
    pub fn add_route(&mut self, route: Route) {
        self.router.insert(route.path().to_string(), Arc::new(route));
    }

    pub fn set_allow_cors(&mut self, value: bool) {
        self.allow_cors = value;
    }

    #[must_use]
    pub const fn allow_cors(&self) -> bool {
        self.allow_cors
    }

    pub fn set_static_content_path(&mut self, path: impl Into<PathBuf>) {
        self.static_root = path.into();
    }

    /// Handler factory: a middleware serving one named file from the
    /// static root. The root is captured at registration time.
    #[must_use]
    pub fn serve_resource(&self, filename: &str) -> Middleware {
        let root = self.static_root.clone();
        let filename = filename.to_string();
        middleware(move |_request, sink, _advance| {
            let root = root.clone();
            let filename = filename.clone();
            async move {
                static_files::serve(&root, &filename, &sink).await?;
                Ok(())
            }
        })
    }

    pub(crate) fn into_state(self) -> ServerState {
        ServerState {
            config: self.config,
            router: self.router,
            allow_cors: self.allow_cors,
            static_root: self.static_root,
        }
    }

    /// Bind and begin accepting connections. `on_ready` fires once the
    /// listener is bound, with the local address. Uses the configured port
    /// when no override is given (default 8080).
    pub async fn start(
        self,
        port: Option<u16>,
        on_ready: impl FnOnce(SocketAddr),
    ) -> Result<(), Box<dyn std::error::Error>> {
        let addr = self.config.socket_addr(port)?;
        let listener = listener::bind_reusable(addr)?;
        let local_addr = listener.local_addr()?;

        logger::log_server_start(&local_addr, &self.config);
        let state = Arc::new(self.into_state());
        let active_connections = Arc::new(AtomicUsize::new(0));
        on_ready(local_addr);

        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    connection::accept_connection(stream, peer_addr, &state, &active_connections);
                }
                Err(e) => {
                    logger::log_error(&format!("Failed to accept connection: {e}"));
                }
            }
        }
    }
}
