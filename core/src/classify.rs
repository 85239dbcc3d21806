//! Content classification of raw response bodies.
//!
//! Servers lie about content-type: reverse proxies and framework defaults
//! return HTML error pages with a JSON content-type, no content-type, or a
//! 200 status. Classification looks at the body as well as the header.

use serde_json::Value;

use crate::http::find_header;

const DOCTYPE_MARKER: &str = "<!doctype";
const HTML_MARKERS: [&str; 4] = [DOCTYPE_MARKER, "<html", "<head", "<body"];

/// A response body tagged by what it actually contains.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedPayload {
    Json(Value),
    Html(String),
    OpaqueText(String),
}

/// Tag `body` as JSON, HTML or opaque text. Never fails.
///
/// A doctype anywhere in the body means HTML, even when the body is also
/// valid JSON under a JSON content-type.
pub fn classify(headers: &[(String, String)], body: &str) -> ClassifiedPayload {
    if body.to_ascii_lowercase().contains(DOCTYPE_MARKER) {
        return ClassifiedPayload::Html(body.to_string());
    }

    let claims_json = find_header(headers, "content-type")
        .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false);

    if claims_json {
        if let Ok(value) = serde_json::from_str::<Value>(body) {
            return ClassifiedPayload::Json(value);
        }
    }

    if looks_like_html(body) {
        ClassifiedPayload::Html(body.to_string())
    } else {
        ClassifiedPayload::OpaqueText(body.to_string())
    }
}

/// Case-insensitive scan for any HTML document marker.
pub fn looks_like_html(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    HTML_MARKERS.iter().any(|marker| lower.contains(marker))
}
