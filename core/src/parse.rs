//! Safe JSON extraction from a classified payload.

use serde_json::Value;

use crate::classify::ClassifiedPayload;

const PREVIEW_CHARS: usize = 100;

/// Why a payload could not be turned into JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub is_html_response: bool,
    pub status: u16,
    /// First 100 characters of a non-HTML body, kept for logging only.
    pub raw_text_preview: Option<String>,
}

/// Extract a JSON value, falling back to a last-resort parse of opaque text.
///
/// An empty opaque body means "no data" and yields `Value::Null`. HTML is
/// never mined for content.
pub fn parse(classified: ClassifiedPayload, status: u16) -> Result<Value, ParseFailure> {
    match classified {
        ClassifiedPayload::Json(value) => Ok(value),
        ClassifiedPayload::Html(_) => Err(ParseFailure {
            is_html_response: true,
            status,
            raw_text_preview: None,
        }),
        ClassifiedPayload::OpaqueText(text) => {
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&text).map_err(|_| ParseFailure {
                is_html_response: false,
                status,
                raw_text_preview: Some(text.chars().take(PREVIEW_CHARS).collect()),
            })
        }
    }
}
