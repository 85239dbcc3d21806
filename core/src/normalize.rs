//! Reduce any failed request to a single `NormalizedError`.
//!
//! Rules are tried in order and the first match wins: network failure, HTML
//! page, JSON `message` string, JSON `message` array (validation issues),
//! JSON `error` string, then a fixed table keyed by status.

use serde_json::Value;

use crate::classify::looks_like_html;
use crate::error::{ErrorKind, NormalizedError};
use crate::parse::ParseFailure;

pub const NETWORK_ERROR_MESSAGE: &str =
    "Unable to connect to the server. Please check your internet connection.";

const SERVER_ERROR_MESSAGE: &str = "A server error occurred. Please try again later.";

/// What went wrong, before it is turned into a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    /// The body was an HTML page.
    Html,
    /// The body was JSON; usually an error envelope.
    Json(Value),
    /// The body was neither HTML nor JSON.
    Text { preview: Option<String> },
    /// No response was received.
    Network { detail: String },
}

impl From<ParseFailure> for Failure {
    fn from(failure: ParseFailure) -> Self {
        if failure.is_html_response {
            Failure::Html
        } else {
            Failure::Text {
                preview: failure.raw_text_preview,
            }
        }
    }
}

/// Build the user-facing error for `failure`.
///
/// `status` is ignored for `Failure::Network`. An unauthorized error raised
/// while a logout is in flight comes back with `suppressed` set.
pub fn normalize(
    failure: &Failure,
    status: u16,
    status_text: &str,
    is_logging_out: bool,
) -> NormalizedError {
    let mut error = match failure {
        Failure::Network { .. } => {
            NormalizedError::new(NETWORK_ERROR_MESSAGE, None, ErrorKind::NetworkError)
        }
        Failure::Html => html_error(status),
        Failure::Json(body) => match body_message(body) {
            Some(message) => NormalizedError::new(
                message,
                Some(status),
                status_kind(status).unwrap_or(ErrorKind::ValidationError),
            ),
            None => status_error(status, status_text),
        },
        Failure::Text { .. } => status_error(status, status_text),
    };
    error.suppressed = error.kind == ErrorKind::Unauthorized && is_logging_out;
    error
}

fn html_error(status: u16) -> NormalizedError {
    let (message, kind) = match status {
        404 => ("API endpoint not found (404)".to_string(), ErrorKind::NotFound),
        401 => ("Authentication required (401)".to_string(), ErrorKind::Unauthorized),
        403 => (
            "Not authorized to access this resource (403)".to_string(),
            ErrorKind::Forbidden,
        ),
        500 => (SERVER_ERROR_MESSAGE.to_string(), ErrorKind::ServerError),
        200..=299 => (
            "Received an unexpected response from the server.".to_string(),
            ErrorKind::HtmlResponse,
        ),
        other => (
            format!("Received an unexpected response from the server ({other})."),
            ErrorKind::Unknown,
        ),
    };
    NormalizedError::new(message, Some(status), kind)
}

/// Pull a displayable message out of a JSON error body.
fn body_message(body: &Value) -> Option<String> {
    let message = match body.get("message") {
        Some(Value::String(s)) => displayable(s),
        Some(Value::Array(items)) => items
            .first()
            .and_then(issue_message)
            .and_then(|m| displayable(&m)),
        _ => None,
    };
    message.or_else(|| body.get("error").and_then(Value::as_str).and_then(displayable))
}

/// Message for the first entry of a validation-issue array.
fn issue_message(issue: &Value) -> Option<String> {
    match issue {
        Value::String(s) => displayable(s),
        Value::Object(fields) if fields.contains_key("validation") || fields.contains_key("path") => {
            let field = issue_field_name(issue);
            let text = issue
                .get("code")
                .and_then(Value::as_str)
                .and_then(validation_message)
                .map(str::to_string)
                .or_else(|| issue.get("message").and_then(Value::as_str).and_then(displayable))
                .unwrap_or_else(|| "Invalid value".to_string());
            Some(match field {
                Some(field) => format!("{field}: {text}"),
                None => text,
            })
        }
        Value::Object(_) => issue.get("message").and_then(Value::as_str).and_then(displayable),
        _ => None,
    }
}

fn issue_field_name(issue: &Value) -> Option<String> {
    let from_path = issue
        .get("path")
        .and_then(Value::as_array)
        .and_then(|segments| segments.iter().rev().find_map(Value::as_str));
    let raw = match from_path {
        Some(name) => name,
        None => issue.get("validation").and_then(Value::as_str)?,
    };
    let title = title_case(raw);
    (!title.is_empty()).then_some(title)
}

fn validation_message(code: &str) -> Option<&'static str> {
    match code {
        "invalid_string" => Some("Please enter a valid URL"),
        "too_small" => Some("This input is too short"),
        "too_big" => Some("This input is too long"),
        "invalid_type" => Some("This field is required"),
        "invalid_enum_value" => Some("Please select a valid option"),
        "invalid_date" => Some("Please enter a valid date"),
        _ => None,
    }
}

/// `videoUrl` becomes `Video Url`; runs of capitals stay together, so
/// `videoURL` becomes `Video URL`.
fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for c in name.chars() {
        match prev {
            None => out.extend(c.to_uppercase()),
            Some(p) => {
                if c.is_uppercase() && p.is_lowercase() {
                    out.push(' ');
                }
                out.push(c);
            }
        }
        prev = Some(c);
    }
    out
}

/// Kind implied by a status. Body messages and the fallback table share it,
/// so a status never changes kind depending on what the body says.
fn status_kind(status: u16) -> Option<ErrorKind> {
    ErrorKind::from_status(status).or(match status {
        400 | 409 | 422 => Some(ErrorKind::ValidationError),
        429 | 200..=299 => Some(ErrorKind::Unknown),
        _ => None,
    })
}

fn status_error(status: u16, status_text: &str) -> NormalizedError {
    let message = match status {
        400 => "Invalid request. Please check your input and try again.".to_string(),
        401 => "Your session has expired. Please log in again.".to_string(),
        403 => "You do not have permission to perform this action.".to_string(),
        404 => "The requested resource was not found.".to_string(),
        409 => "This action conflicts with existing data.".to_string(),
        422 => "The submitted data is invalid. Please review your input.".to_string(),
        429 => "Too many requests. Please wait a moment and try again.".to_string(),
        500 => SERVER_ERROR_MESSAGE.to_string(),
        200..=299 => "The server returned a response that could not be read.".to_string(),
        other => format!("{other}: {}", reason_phrase(other, status_text)),
    };
    NormalizedError::new(
        message,
        Some(status),
        status_kind(status).unwrap_or(ErrorKind::Unknown),
    )
}

fn reason_phrase(status: u16, status_text: &str) -> String {
    if let Some(text) = displayable(status_text) {
        return text;
    }
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown Status")
        .to_string()
}

/// Trimmed text that is safe to show: not blank and not HTML.
fn displayable(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty() && !looks_like_html(trimmed)).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn json_failure(body: Value) -> Failure {
        Failure::Json(body)
    }

    #[test]
    fn html_404_names_the_endpoint() {
        let err = normalize(&Failure::Html, 404, "Not Found", false);
        assert_eq!(err.message, "API endpoint not found (404)");
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.status, Some(404));
    }

    #[test]
    fn html_500_is_a_server_error() {
        let err = normalize(&Failure::Html, 500, "Internal Server Error", false);
        assert_eq!(err.message, SERVER_ERROR_MESSAGE);
        assert_eq!(err.kind, ErrorKind::ServerError);
    }

    #[test]
    fn html_on_success_status_is_html_response() {
        let err = normalize(&Failure::Html, 200, "OK", false);
        assert_eq!(err.kind, ErrorKind::HtmlResponse);
        assert!(!err.message.contains('<'));
    }

    #[test]
    fn html_with_unmapped_status_is_unknown() {
        let err = normalize(&Failure::Html, 502, "Bad Gateway", false);
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert!(err.message.contains("502"));
    }

    #[test]
    fn message_string_is_used_verbatim() {
        let err = normalize(&json_failure(json!({"message": "Title is required"})), 400, "", false);
        assert_eq!(err.message, "Title is required");
        assert_eq!(err.kind, ErrorKind::ValidationError);
    }

    #[test]
    fn message_string_kind_follows_status() {
        let err = normalize(&json_failure(json!({"message": "Course not found"})), 404, "", false);
        assert_eq!(err.kind, ErrorKind::NotFound);
        let err = normalize(&json_failure(json!({"message": "Not authenticated"})), 401, "", false);
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[test]
    fn validation_issue_is_composed_with_field_name() {
        let body = json!({
            "message": [
                {"validation": "url", "code": "invalid_string", "message": "Invalid url", "path": ["videoUrl"]},
                {"code": "too_small", "path": ["title"]}
            ]
        });
        let err = normalize(&json_failure(body), 400, "Bad Request", false);
        assert_eq!(err.message, "Video Url: Please enter a valid URL");
        assert_eq!(err.kind, ErrorKind::ValidationError);
    }

    #[test]
    fn validation_issue_uses_last_path_segment() {
        let body = json!({"message": [{"code": "too_small", "path": ["questions", 0, "questionText"]}]});
        let err = normalize(&json_failure(body), 400, "", false);
        assert_eq!(err.message, "Question Text: This input is too short");
    }

    #[test]
    fn unmapped_issue_code_falls_back_to_its_message() {
        let body = json!({"message": [{"code": "custom", "message": "Must be unique", "path": ["slug"]}]});
        let err = normalize(&json_failure(body), 422, "", false);
        assert_eq!(err.message, "Slug: Must be unique");
    }

    #[test]
    fn plain_string_array_uses_first_entry() {
        let body = json!({"message": ["email must be an email", "name should not be empty"]});
        let err = normalize(&json_failure(body), 400, "", false);
        assert_eq!(err.message, "email must be an email");
    }

    #[test]
    fn error_field_is_used_when_message_is_absent() {
        let err = normalize(&json_failure(json!({"error": "Test not found"})), 404, "", false);
        assert_eq!(err.message, "Test not found");
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn blank_messages_fall_through_to_status_table() {
        let body = json!({"message": "  ", "error": ""});
        let err = normalize(&json_failure(body), 409, "Conflict", false);
        assert_eq!(err.message, "This action conflicts with existing data.");
    }

    #[test]
    fn unmapped_status_uses_status_text() {
        let err = normalize(&Failure::Text { preview: None }, 418, "I'm a teapot", false);
        assert_eq!(err.message, "418: I'm a teapot");
        assert_eq!(err.kind, ErrorKind::Unknown);
    }

    #[test]
    fn unmapped_status_without_text_uses_canonical_reason() {
        let err = normalize(&json_failure(Value::Null), 503, "", false);
        assert_eq!(err.message, "503: Service Unavailable");
        assert_eq!(err.kind, ErrorKind::ServerError);
    }

    #[test]
    fn network_failure_has_no_status() {
        let failure = Failure::Network {
            detail: "connection refused".to_string(),
        };
        let err = normalize(&failure, 0, "", false);
        assert_eq!(err.message, NETWORK_ERROR_MESSAGE);
        assert_eq!(err.kind, ErrorKind::NetworkError);
        assert_eq!(err.status, None);
    }

    #[test]
    fn unauthorized_is_suppressed_only_while_logging_out() {
        let failure = json_failure(json!({"message": "Not authenticated"}));
        assert!(normalize(&failure, 401, "", true).suppressed);
        assert!(!normalize(&failure, 401, "", false).suppressed);
        assert!(!normalize(&failure, 403, "", true).suppressed);
    }

    #[test]
    fn title_case_splits_camel_case() {
        assert_eq!(title_case("videoUrl"), "Video Url");
        assert_eq!(title_case("title"), "Title");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn title_case_keeps_capital_runs_together() {
        assert_eq!(title_case("videoURL"), "Video URL");
        assert_eq!(title_case("courseID"), "Course ID");
    }

    #[test]
    fn rate_limit_message_is_not_a_validation_error() {
        let with_body = normalize(&json_failure(json!({"message": "Slow down"})), 429, "", false);
        let empty = normalize(&json_failure(Value::Null), 429, "", false);
        assert_eq!(with_body.message, "Slow down");
        assert_eq!(with_body.kind, ErrorKind::Unknown);
        assert_eq!(empty.kind, ErrorKind::Unknown);
    }

    #[test]
    fn html_in_a_json_message_is_not_shown() {
        let body = json!({"message": "<html><body>Proxy error</body></html>"});
        let err = normalize(&json_failure(body), 502, "<html>Bad Gateway</html>", false);
        assert_eq!(err.message, "502: Bad Gateway");
    }

    fn arb_text() -> impl Strategy<Value = String> {
        prop_oneof![
            ".{0,30}",
            "[ ]{0,3}",
            "<html><body>[a-z ]{0,12}</body></html>",
            "<!DOCTYPE html>[a-z]{0,8}",
        ]
    }

    fn arb_error_body() -> impl Strategy<Value = Value> {
        let code = prop_oneof![
            Just("invalid_string"),
            Just("too_small"),
            Just("custom"),
            Just(""),
        ];
        let issue = (arb_text(), arb_text(), code).prop_map(|(field, message, code)| {
            json!({"code": code, "message": message, "path": [field]})
        });
        prop_oneof![
            Just(Value::Null),
            arb_text().prop_map(|m| json!({ "message": m })),
            arb_text().prop_map(|e| json!({ "error": e })),
            proptest::collection::vec(arb_text(), 0..3).prop_map(|m| json!({ "message": m })),
            issue.prop_map(|i| json!({ "message": [i] })),
            (arb_text(), arb_text()).prop_map(|(m, e)| json!({ "message": m, "error": e })),
            any::<i64>().prop_map(Value::from),
        ]
    }

    fn arb_failure() -> impl Strategy<Value = Failure> {
        prop_oneof![
            Just(Failure::Html),
            arb_error_body().prop_map(Failure::Json),
            proptest::option::of(arb_text()).prop_map(|preview| Failure::Text { preview }),
            arb_text().prop_map(|detail| Failure::Network { detail }),
        ]
    }

    proptest! {
        // Whatever the server sends, the message is displayable.
        #[test]
        fn prop_message_is_never_blank_or_html(
            failure in arb_failure(),
            status in 100u16..600,
            status_text in arb_text(),
            logging_out in any::<bool>(),
        ) {
            let err = normalize(&failure, status, &status_text, logging_out);
            prop_assert!(!err.message.trim().is_empty());
            prop_assert!(!looks_like_html(&err.message), "{}", err.message);
            prop_assert!(!err.suppressed || (logging_out && err.kind == ErrorKind::Unauthorized));
        }

        // For statuses in the fallback table, a body message never changes the kind.
        #[test]
        fn prop_table_status_kind_ignores_body(
            status in prop::sample::select(vec![400u16, 401, 403, 404, 409, 422, 429, 500]),
            body in arb_error_body(),
        ) {
            let with_body = normalize(&Failure::Json(body), status, "", false);
            let without = normalize(&Failure::Json(Value::Null), status, "", false);
            prop_assert_eq!(with_body.kind, without.kind);
        }
    }
}
