//! Response-normalization client core for the LMS REST API.
//!
//! # Overview
//! Sits between UI code and the network. Every API call ends in either parsed
//! JSON or a single `NormalizedError` with a message that is safe to show,
//! even when the server answers with an HTML error page, an empty body or a
//! wrong content-type.
//!
//! # Design
//! - `classify` tags a body as JSON, HTML or opaque text; `parse` extracts
//!   JSON with a last-resort fallback; `normalize` turns any failure into a
//!   `NormalizedError`.
//! - `ApiClient` builds plain-data `HttpRequest`s and interprets
//!   `HttpResponse`s; only a `Transport` does I/O (host-does-IO pattern).
//! - The logout gate is an injected `LogoutGate`, not a global, so each
//!   client (and each test) owns its own flag.
//! - Failures are reported through an `ErrorNotifier` unless suppressed.

pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod logout;
pub mod normalize;
pub mod notify;
pub mod parse;
pub mod transport;
pub mod types;

pub use classify::{classify, ClassifiedPayload};
pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::{ConfigError, ErrorKind, NormalizedError, TransportError};
pub use http::{
    CredentialsMode, FormData, FormField, FormValue, HttpMethod, HttpRequest, HttpResponse,
    RequestBody, RequestDescriptor,
};
pub use logout::{LogoutGate, LogoutGuard};
pub use normalize::{normalize, Failure, NETWORK_ERROR_MESSAGE};
pub use notify::{ErrorNotifier, Toast, ToastVariant, TracingNotifier};
pub use parse::{parse, ParseFailure};
pub use transport::{ReqwestTransport, Transport};
pub use types::{Course, CreateEnrollment, CreateTest, Enrollment, Test};
