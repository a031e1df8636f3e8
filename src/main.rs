use midway::config::Config;
use midway::logger;
use midway::routing::{middleware, Route};
use midway::server::Server;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load()?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(run(cfg))
}

async fn run(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut server = Server::new(cfg);
    server.set_allow_cors(true);

    let log_request = middleware(|request, _sink, advance| async move {
        logger::log_request(&request.method, &request.path);
        advance.advance();
        Ok(())
    });
    let serve_index = server.serve_resource("index.html");

    server.add_route(
        Route::new("/")
            .get([log_request, serve_index])
            .post([middleware(|_request, sink, _advance| async move {
                sink.write_head(200, &[("Content-Type", "text/plain")])?;
                sink.write(b"Server is working")?;
                sink.end()?;
                Ok(())
            })]),
    );

    server
        .start(None, |addr| {
            logger::log_server_ready(std::process::id(), &addr);
        })
        .await
}
