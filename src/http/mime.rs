//! MIME type registry
//!
//! Returns the Content-Type for a file extension. The table is fixed for
//! the process lifetime; unknown extensions map to the octet-stream
//! default.

/// Get MIME Content-Type based on file extension
///
/// # Examples
/// ```
/// use midway::http::mime::get_content_type;
/// assert_eq!(get_content_type(Some("html")), "text/html");
/// assert_eq!(get_content_type(Some("css")), "text/css");
/// assert_eq!(get_content_type(None), "application/octet-stream");
/// ```
#[must_use]
pub fn get_content_type(extension: Option<&str>) -> &'static str {
    match extension {
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        _ => "application/octet-stream",
    }
}
