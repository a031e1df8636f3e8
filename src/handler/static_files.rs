//! Static file serving module
//!
//! Resolves a request path under the configured root, reads the file once,
//! and writes it through the response sink. Filesystem errors translate to
//! HTTP status codes: absent file to 404, anything else to 500.

use crate::http::{mime, ResponseSink, SinkError};
use crate::logger;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

const NOT_FOUND_BODY: &[u8] = b"File not found.";

/// Serve one file under `root`. Exactly one filesystem read per call, no
/// caching.
pub async fn serve(root: &Path, request_path: &str, sink: &ResponseSink) -> Result<(), SinkError> {
    let Some(file_path) = resolve(root, request_path) else {
        return respond_not_found(sink);
    };

    match fs::read(&file_path).await {
        Ok(content) => {
            let content_type =
                mime::get_content_type(file_path.extension().and_then(|e| e.to_str()));
            sink.write_head(200, &[("Content-Type", content_type)])?;
            sink.write(&content)?;
            sink.end()
        }
        Err(err) if err.kind() == ErrorKind::NotFound => respond_not_found(sink),
        Err(err) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {err}",
                file_path.display()
            ));
            sink.write_head(500, &[("Content-Type", "text/plain")])?;
            sink.write(format!("Internal Server Error: {err}").as_bytes())?;
            sink.end()
        }
    }
}

/// Resolve the request path under the root, refusing paths that escape it.
/// Returns `None` when the target cannot exist under the root; the caller
/// answers 404 either way.
fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    // Remove leading slash and prevent directory traversal
    let clean_path = request_path.trim_start_matches('/').replace("..", "");
    let file_path = root.join(&clean_path);

    let root_canonical = root.canonicalize().ok()?;
    match file_path.canonicalize() {
        Ok(canonical) if canonical.starts_with(&root_canonical) => Some(file_path),
        Ok(canonical) => {
            logger::log_warning(&format!(
                "Path traversal attempt blocked: {request_path} -> {}",
                canonical.display()
            ));
            None
        }
        // Absent files fail canonicalization; keep the joined path so the
        // read reports NotFound itself
        Err(_) => Some(file_path),
    }
}

fn respond_not_found(sink: &ResponseSink) -> Result<(), SinkError> {
    sink.write_head(404, &[("Content-Type", "text/plain")])?;
    sink.write(NOT_FOUND_BODY)?;
    sink.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn fixture_root(files: &[(&str, &[u8])]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            let mut file = std::fs::File::create(dir.path().join(name)).unwrap();
            file.write_all(content).unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn test_serves_existing_file_with_content_type() {
        let root = fixture_root(&[("index.html", b"<h1>hello</h1>")]);
        let sink = ResponseSink::new();

        serve(root.path(), "/index.html", &sink).await.unwrap();

        assert_eq!(sink.status(), Some(200));
        assert_eq!(
            sink.headers(),
            vec![("Content-Type".to_string(), "text/html".to_string())]
        );
        assert_eq!(&sink.body()[..], b"<h1>hello</h1>");
        assert!(sink.is_ended());
    }

    #[tokio::test]
    async fn test_missing_file_answers_404() {
        let root = fixture_root(&[]);
        let sink = ResponseSink::new();

        serve(root.path(), "/missing.html", &sink).await.unwrap();

        assert_eq!(sink.status(), Some(404));
        assert_eq!(&sink.body()[..], b"File not found.");
    }

    #[tokio::test]
    async fn test_unknown_extension_is_octet_stream() {
        let root = fixture_root(&[("data.bin", b"\x00\x01")]);
        let sink = ResponseSink::new();

        serve(root.path(), "/data.bin", &sink).await.unwrap();

        assert_eq!(sink.status(), Some(200));
        assert_eq!(
            sink.headers()[0].1,
            "application/octet-stream".to_string()
        );
    }

    #[tokio::test]
    async fn test_traversal_is_answered_as_not_found() {
        let root = fixture_root(&[("inside.txt", b"safe")]);
        let sink = ResponseSink::new();

        serve(root.path(), "/../../etc/passwd", &sink).await.unwrap();

        assert_eq!(sink.status(), Some(404));
        assert_eq!(&sink.body()[..], b"File not found.");
    }

    #[tokio::test]
    async fn test_missing_root_answers_404() {
        let sink = ResponseSink::new();

        serve(Path::new("/nonexistent-root-dir"), "/a.html", &sink)
            .await
            .unwrap();

        assert_eq!(sink.status(), Some(404));
    }
}
