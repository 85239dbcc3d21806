//! Error types for the LMS API client.
//!
//! # Design
//! Callers of `ApiClient` only ever see `NormalizedError`: raw parse errors,
//! HTML bodies and transport failures are folded into it before returning.
//! `TransportError` is the network seam's error and `ConfigError` covers
//! invalid input to the client itself.

use serde::Serialize;
use thiserror::Error;

/// Machine-readable category of a `NormalizedError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// The server answered with an HTML page where JSON was expected.
    HtmlResponse,
    Unauthorized,
    Forbidden,
    NotFound,
    ServerError,
    /// No response was received at all.
    NetworkError,
    ValidationError,
    Unknown,
}

impl ErrorKind {
    /// Kind implied by the status alone, if any.
    pub(crate) fn from_status(status: u16) -> Option<Self> {
        match status {
            401 => Some(ErrorKind::Unauthorized),
            403 => Some(ErrorKind::Forbidden),
            404 => Some(ErrorKind::NotFound),
            500..=599 => Some(ErrorKind::ServerError),
            _ => None,
        }
    }
}

/// A failed request, reduced to one user-presentable message.
///
/// `message` is never empty and is safe to show verbatim. When `suppressed`
/// is set the error must still fail the operation but must not be shown.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct NormalizedError {
    pub message: String,
    pub status: Option<u16>,
    pub kind: ErrorKind,
    pub suppressed: bool,
}

impl NormalizedError {
    pub(crate) fn new(message: impl Into<String>, status: Option<u16>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            status,
            kind,
            suppressed: false,
        }
    }
}

/// Failure to obtain any response from the server.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to read response body: {0}")]
    Body(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            TransportError::Body(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Invalid client input or configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported HTTP method: {0}")]
    InvalidMethod(String),

    #[error("invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_user_message() {
        let err = NormalizedError::new("Server error occurred", Some(500), ErrorKind::ServerError);
        assert_eq!(err.to_string(), "Server error occurred");
        assert!(!err.suppressed);
    }

    #[test]
    fn kind_serializes_in_pascal_case() {
        let json = serde_json::to_value(ErrorKind::NetworkError).unwrap();
        assert_eq!(json, "NetworkError");
    }

    #[test]
    fn status_implies_kind() {
        assert_eq!(ErrorKind::from_status(401), Some(ErrorKind::Unauthorized));
        assert_eq!(ErrorKind::from_status(503), Some(ErrorKind::ServerError));
        assert_eq!(ErrorKind::from_status(400), None);
    }
}
