//! Request dispatch module
//!
//! Entry point for HTTP request processing: buffers the body, applies
//! cross-cutting policy (CORS, content-type-driven body parsing), and
//! forwards to the matched route's middleware chain or to the static file
//! fallback. Every outcome is written through one per-request sink so the
//! header order and CORS policy are uniform.

use crate::handler::static_files;
use crate::http::{RequestBody, RequestContext, ResponseSink};
use crate::logger::{self, AccessLogEntry};
use crate::server::ServerState;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::{HeaderMap, Method, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<ServerState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    // Accumulate the full body before any routing decision
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            logger::log_error(&format!("Failed to read request body: {err}"));
            return Ok(build_early_response(
                state.allow_cors,
                400,
                "Bad request body.",
            ));
        }
    };

    let path = parts.uri.path().to_string();
    Ok(respond(&state, parts.method, path, parts.headers, &bytes).await)
}

/// Process one buffered request and produce the transport response
pub async fn respond(
    state: &ServerState,
    method: Method,
    path: String,
    headers: HeaderMap,
    body: &[u8],
) -> Response<Full<Bytes>> {
    let mut entry = AccessLogEntry::new(method.to_string(), path.clone());

    let sink = process(state, method, path, headers, body).await;
    let response = sink.to_response();

    if state.config.logging.access_log {
        entry.status = response.status().as_u16();
        entry.body_bytes = sink.body().len();
        logger::log_access(&entry);
    }
    response
}

/// Run the dispatch pipeline against a fresh sink and await termination
pub(crate) async fn process(
    state: &ServerState,
    method: Method,
    path: String,
    headers: HeaderMap,
    body: &[u8],
) -> Arc<ResponseSink> {
    let sink = Arc::new(ResponseSink::new());

    // CORS policy applies before any other header, on every outcome
    if state.allow_cors {
        if let Err(err) = sink.set_header("Access-Control-Allow-Origin", "*") {
            logger::log_warning(&format!("Could not set CORS header: {err}"));
        }
    }

    logger::log_headers_count(headers.len(), state.config.logging.show_headers);

    let text = String::from_utf8_lossy(body).into_owned();
    let content_type = headers
        .get(hyper::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    // Held until the sink terminates so an abandoned request (client
    // disconnect) halts its chain instead of leaking scheduled middleware
    let mut chain_run = None;

    match parse_request_body(&content_type, text) {
        Ok(parsed) => {
            let request = Arc::new(RequestContext {
                method: method.clone(),
                path: path.clone(),
                headers,
                body: parsed,
            });
            if let Some(route) = state.router.get(&path) {
                chain_run = Some(route.dispatch(&method, request, Arc::clone(&sink)));
            } else if let Err(err) =
                static_files::serve(&state.static_root, &path, &sink).await
            {
                logger::log_error(&format!("Static serve failed for {path}: {err}"));
            }
        }
        Err(err) => {
            logger::log_warning(&format!("Malformed JSON body for {method} {path}: {err}"));
            if let Err(sink_err) = reject(&sink, &format!("Malformed JSON body: {err}")) {
                logger::log_warning(&format!("Could not write reject response: {sink_err}"));
            }
        }
    }

    sink.finished().await;
    drop(chain_run);
    sink
}

/// Convert the buffered body according to the declared content type
fn parse_request_body(
    content_type: &str,
    text: String,
) -> Result<RequestBody, serde_json::Error> {
    match content_type {
        "application/json" => Ok(RequestBody::Json(serde_json::from_str(&text)?)),
        _ => Ok(RequestBody::Text(text)),
    }
}

fn reject(sink: &ResponseSink, message: &str) -> Result<(), crate::http::SinkError> {
    sink.write_head(400, &[("Content-Type", "text/plain")])?;
    sink.write(message.as_bytes())?;
    sink.end()
}

/// Response for failures that happen before a sink-driven dispatch can
/// start (transport body read errors)
fn build_early_response(allow_cors: bool, status: u16, message: &str) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(status);
    if allow_cors {
        builder = builder.header("Access-Control-Allow-Origin", "*");
    }
    builder = builder.header("Content-Type", "text/plain");
    builder
        .body(Full::new(Bytes::from(message.to_string())))
        .unwrap_or_else(|e| {
            logger::log_error(&format!("Failed to build {status} response: {e}"));
            Response::new(Full::new(Bytes::new()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::routing::{middleware, Route};
    use crate::server::Server;
    use hyper::header::CONTENT_TYPE;
    use std::io::Write as _;

    fn static_fixture(files: &[(&str, &[u8])]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            let mut file = std::fs::File::create(dir.path().join(name)).unwrap();
            file.write_all(content).unwrap();
        }
        dir
    }

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "application/json".parse().unwrap());
        headers
    }

    #[tokio::test]
    async fn test_malformed_json_answers_400() {
        let server = Server::new(Config::default());
        let state = server.into_state();

        let sink = process(
            &state,
            Method::POST,
            "/".to_string(),
            json_headers(),
            b"{not json",
        )
        .await;

        assert_eq!(sink.status(), Some(400));
        assert!(String::from_utf8_lossy(&sink.body()).starts_with("Malformed JSON body:"));
    }

    #[tokio::test]
    async fn test_valid_json_reaches_the_chain() {
        let mut server = Server::new(Config::default());
        server.add_route(Route::new("/").post([middleware(
            |request, sink, _advance| async move {
                let name = request.body.as_json().and_then(|v| v["name"].as_str().map(String::from));
                sink.write_head(200, &[("Content-Type", "text/plain")])?;
                sink.write(name.unwrap_or_default().as_bytes())?;
                sink.end()?;
                Ok(())
            },
        )]));
        let state = server.into_state();

        let sink = process(
            &state,
            Method::POST,
            "/".to_string(),
            json_headers(),
            br#"{"name": "midway"}"#,
        )
        .await;

        assert_eq!(sink.status(), Some(200));
        assert_eq!(&sink.body()[..], b"midway");
    }

    #[tokio::test]
    async fn test_cors_is_the_first_header_on_every_outcome() {
        let root = static_fixture(&[]);
        let mut server = Server::new(Config::default());
        server.set_allow_cors(true);
        server.set_static_content_path(root.path());
        assert!(server.allow_cors());
        let state = server.into_state();

        // Static miss outcome
        let sink = process(
            &state,
            Method::GET,
            "/missing.html".to_string(),
            HeaderMap::new(),
            b"",
        )
        .await;
        assert_eq!(sink.status(), Some(404));
        assert_eq!(sink.headers()[0].0, "Access-Control-Allow-Origin");
        assert_eq!(sink.headers()[0].1, "*");

        // Parse failure outcome
        let sink = process(
            &state,
            Method::POST,
            "/".to_string(),
            json_headers(),
            b"oops{",
        )
        .await;
        assert_eq!(sink.status(), Some(400));
        assert_eq!(sink.headers()[0].0, "Access-Control-Allow-Origin");
    }

    #[tokio::test]
    async fn test_get_root_runs_chain_and_serves_index() {
        let root = static_fixture(&[("index.html", b"<html>home</html>")]);
        let mut server = Server::new(Config::default());
        server.set_static_content_path(root.path());

        let log = middleware(|request, _sink, advance| async move {
            crate::logger::log_request(&request.method, &request.path);
            advance.advance();
            Ok(())
        });
        let index = server.serve_resource("index.html");
        server.add_route(Route::new("/").get([log, index]));
        let state = server.into_state();

        let sink = process(
            &state,
            Method::GET,
            "/".to_string(),
            HeaderMap::new(),
            b"",
        )
        .await;

        assert_eq!(sink.status(), Some(200));
        let headers = sink.headers();
        assert!(headers.contains(&("Content-Type".to_string(), "text/html".to_string())));
        assert_eq!(&sink.body()[..], b"<html>home</html>");
    }

    #[tokio::test]
    async fn test_post_root_answers_with_plain_text() {
        let mut server = Server::new(Config::default());
        server.add_route(Route::new("/").post([middleware(
            |_request, sink, _advance| async move {
                sink.write_head(200, &[("Content-Type", "text/plain")])?;
                sink.write(b"Server is working")?;
                sink.end()?;
                Ok(())
            },
        )]));
        let state = server.into_state();

        let sink = process(
            &state,
            Method::POST,
            "/".to_string(),
            HeaderMap::new(),
            b"",
        )
        .await;

        assert_eq!(sink.status(), Some(200));
        assert!(sink
            .headers()
            .contains(&("Content-Type".to_string(), "text/plain".to_string())));
        assert_eq!(&sink.body()[..], b"Server is working");
    }

    #[tokio::test]
    async fn test_unmatched_path_falls_back_to_static() {
        let root = static_fixture(&[("style.css", b"body{}")]);
        let mut server = Server::new(Config::default());
        server.set_static_content_path(root.path());
        server.add_route(Route::new("/api"));
        let state = server.into_state();

        let sink = process(
            &state,
            Method::GET,
            "/style.css".to_string(),
            HeaderMap::new(),
            b"",
        )
        .await;

        assert_eq!(sink.status(), Some(200));
        assert!(sink
            .headers()
            .contains(&("Content-Type".to_string(), "text/css".to_string())));
    }

    #[tokio::test]
    async fn test_matched_path_with_unregistered_method_answers_404() {
        let mut server = Server::new(Config::default());
        server.add_route(Route::new("/api").get([middleware(
            |_request, sink, _advance| async move {
                sink.write_head(200, &[])?;
                sink.end()?;
                Ok(())
            },
        )]));
        let state = server.into_state();

        let sink = process(
            &state,
            Method::PUT,
            "/api".to_string(),
            HeaderMap::new(),
            b"",
        )
        .await;

        assert_eq!(sink.status(), Some(404));
        assert_eq!(&sink.body()[..], b"Path PUT /api not found.");
    }

    #[tokio::test]
    async fn test_last_registration_for_a_path_wins() {
        let mut server = Server::new(Config::default());
        server.add_route(Route::new("/dup").get([middleware(
            |_request, sink, _advance| async move {
                sink.write_head(200, &[])?;
                sink.write(b"first")?;
                sink.end()?;
                Ok(())
            },
        )]));
        server.add_route(Route::new("/dup").get([middleware(
            |_request, sink, _advance| async move {
                sink.write_head(200, &[])?;
                sink.write(b"second")?;
                sink.end()?;
                Ok(())
            },
        )]));
        let state = server.into_state();

        let sink = process(
            &state,
            Method::GET,
            "/dup".to_string(),
            HeaderMap::new(),
            b"",
        )
        .await;

        assert_eq!(&sink.body()[..], b"second");
    }

    #[tokio::test]
    async fn test_json_with_charset_suffix_stays_raw_text() {
        let mut server = Server::new(Config::default());
        server.add_route(Route::new("/").post([middleware(
            |request, sink, _advance| async move {
                let is_text = request.body.as_text().is_some();
                sink.write_head(200, &[])?;
                sink.write(if is_text { b"text" } else { b"json" })?;
                sink.end()?;
                Ok(())
            },
        )]));
        let state = server.into_state();

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            "application/json; charset=utf-8".parse().unwrap(),
        );
        let sink = process(&state, Method::POST, "/".to_string(), headers, b"not json").await;

        assert_eq!(&sink.body()[..], b"text");
    }
}
