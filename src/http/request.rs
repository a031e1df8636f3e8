//! Request context module
//!
//! Per-request state handed to middleware: method, path, headers, and the
//! buffered body. One context exists per request and is never shared
//! across requests.

use hyper::{HeaderMap, Method};

/// Buffered request body after the content-type-driven parse step
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// Raw UTF-8 text (any content type other than `application/json`)
    Text(String),
    /// Structured value decoded from a declared-JSON body
    Json(serde_json::Value),
}

impl RequestBody {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) => None,
        }
    }

    #[must_use]
    pub const fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }
}

impl std::fmt::Display for RequestBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Json(value) => write!(f, "{value}"),
        }
    }
}

/// Immutable request state for one dispatch
#[derive(Debug)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_accessors() {
        let text = RequestBody::Text("hello".to_string());
        assert_eq!(text.as_text(), Some("hello"));
        assert!(text.as_json().is_none());

        let json = RequestBody::Json(serde_json::json!({"ok": true}));
        assert!(json.as_text().is_none());
        assert_eq!(json.as_json().unwrap()["ok"], true);
    }

    #[test]
    fn test_body_display() {
        let json = RequestBody::Json(serde_json::json!({"a": 1}));
        assert_eq!(json.to_string(), "{\"a\":1}");
    }
}
