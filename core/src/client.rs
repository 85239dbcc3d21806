//! Request dispatcher for the LMS API.
//!
//! # Design
//! `ApiClient` splits pure work from I/O: `build_request` produces an `HttpRequest` and `parse_response` interprets an
//! `HttpResponse`, neither touching the network. `request` glues them to a
//! `Transport`, then reports any non-suppressed failure to the notifier.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::classify::classify;
use crate::config::ClientConfig;
use crate::error::{ConfigError, ErrorKind, NormalizedError};
use crate::http::{
    CredentialsMode, FormData, HttpMethod, HttpRequest, HttpResponse, RequestBody,
    RequestDescriptor,
};
use crate::logout::LogoutGate;
use crate::normalize::{normalize, Failure};
use crate::notify::{ErrorNotifier, Toast, TracingNotifier};
use crate::parse::parse;
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{Course, CreateEnrollment, CreateTest, Enrollment, Test};

const UNEXPECTED_SHAPE_MESSAGE: &str = "The server returned data in an unexpected format.";

/// Session-authenticated client for the LMS backend.
pub struct ApiClient<T = ReqwestTransport> {
    config: ClientConfig,
    transport: Arc<T>,
    gate: LogoutGate,
    notifier: Arc<dyn ErrorNotifier>,
}

impl<T> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            transport: Arc::clone(&self.transport),
            gate: self.gate.clone(),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl ApiClient<ReqwestTransport> {
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            transport: Arc::new(transport),
            gate: LogoutGate::new(),
            notifier: Arc::new(TracingNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ErrorNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Share a logout gate owned by the auth layer.
    pub fn with_logout_gate(mut self, gate: LogoutGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn logout_gate(&self) -> &LogoutGate {
        &self.gate
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn build_request(&self, descriptor: &RequestDescriptor) -> HttpRequest {
        let mut headers = vec![("accept".to_string(), "application/json".to_string())];
        if matches!(descriptor.body, Some(RequestBody::Json(_))) {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        HttpRequest {
            method: descriptor.method.normalized(),
            url: self.config.url(&descriptor.path),
            headers,
            body: descriptor.body.clone(),
            credentials: CredentialsMode::Include,
        }
    }

    /// Classify and parse a response. Non-2xx statuses and unreadable bodies
    /// become a `NormalizedError`; no notification is raised here.
    pub fn parse_response(&self, response: HttpResponse) -> Result<Value, NormalizedError> {
        let success = response.is_success();
        let HttpResponse {
            status,
            status_text,
            headers,
            body,
        } = response;

        let failure = match parse(classify(&headers, &body), status) {
            Ok(value) if success => return Ok(value),
            Ok(value) => Failure::Json(value),
            Err(parse_failure) => {
                tracing::debug!(
                    status,
                    html = parse_failure.is_html_response,
                    preview = parse_failure.raw_text_preview.as_deref().unwrap_or(""),
                    "response body is not JSON"
                );
                Failure::from(parse_failure)
            }
        };
        Err(self.normalize(&failure, status, &status_text))
    }

    pub async fn request(&self, descriptor: RequestDescriptor) -> Result<Value, NormalizedError> {
        let request = self.build_request(&descriptor);
        let span = tracing::debug_span!(
            "api_request",
            request_id = %Uuid::new_v4(),
            method = %request.method,
            url = %request.url,
        );
        async move {
            tracing::debug!(form = descriptor.is_form_data(), "sending request");
            let result = match self.transport.execute(request).await {
                Ok(response) => {
                    tracing::debug!(status = response.status, "response received");
                    self.parse_response(response)
                }
                Err(e) => {
                    let failure = Failure::Network {
                        detail: e.to_string(),
                    };
                    Err(self.normalize(&failure, 0, ""))
                }
            };
            result.map_err(|err| self.report(err))
        }
        .instrument(span)
        .await
    }

    /// `request`, then deserialize the value into `D`.
    pub async fn request_as<D: DeserializeOwned>(
        &self,
        descriptor: RequestDescriptor,
    ) -> Result<D, NormalizedError> {
        let value = self.request(descriptor).await?;
        serde_json::from_value(value).map_err(|e| {
            tracing::warn!(error = %e, "response did not match the expected shape");
            self.report(NormalizedError::new(
                UNEXPECTED_SHAPE_MESSAGE,
                None,
                ErrorKind::Unknown,
            ))
        })
    }

    pub async fn get(&self, path: &str) -> Result<Value, NormalizedError> {
        self.request(RequestDescriptor::new(HttpMethod::Get, path))
            .await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Value, NormalizedError> {
        self.request(RequestDescriptor::new(HttpMethod::Post, path).with_json(body))
            .await
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<Value, NormalizedError> {
        self.request(RequestDescriptor::new(HttpMethod::Put, path).with_json(body))
            .await
    }

    /// Sent as PUT on the wire.
    pub async fn patch(&self, path: &str, body: Value) -> Result<Value, NormalizedError> {
        self.request(RequestDescriptor::new(HttpMethod::Patch, path).with_json(body))
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, NormalizedError> {
        self.request(RequestDescriptor::new(HttpMethod::Delete, path))
            .await
    }

    pub async fn post_form(&self, path: &str, form: FormData) -> Result<Value, NormalizedError> {
        self.request(RequestDescriptor::new(HttpMethod::Post, path).with_form(form))
            .await
    }

    /// Send the logout request with the gate raised, so 401s that race the
    /// session teardown are not shown. The gate drops when this returns.
    pub async fn logout(&self, path: &str) -> Result<Value, NormalizedError> {
        let _guard = self.gate.begin();
        tracing::info!(path, "logging out");
        self.request(RequestDescriptor::new(HttpMethod::Post, path))
            .await
    }

    pub async fn list_courses(&self) -> Result<Vec<Course>, NormalizedError> {
        self.request_as(RequestDescriptor::new(HttpMethod::Get, "/api/courses"))
            .await
    }

    pub async fn get_course(&self, id: i64) -> Result<Course, NormalizedError> {
        self.request_as(RequestDescriptor::new(HttpMethod::Get, &format!("/api/courses/{id}")))
            .await
    }

    pub async fn get_test(&self, id: i64) -> Result<Test, NormalizedError> {
        self.request_as(RequestDescriptor::new(HttpMethod::Get, &format!("/api/tests/{id}")))
            .await
    }

    pub async fn create_test(&self, input: &CreateTest) -> Result<Test, NormalizedError> {
        let descriptor = self.json_descriptor(HttpMethod::Post, "/api/tests", input)?;
        self.request_as(descriptor).await
    }

    pub async fn enroll(&self, course_id: i64) -> Result<Enrollment, NormalizedError> {
        let descriptor = self.json_descriptor(
            HttpMethod::Post,
            "/api/enrollments",
            &CreateEnrollment { course_id },
        )?;
        self.request_as(descriptor).await
    }

    fn json_descriptor<B: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        input: &B,
    ) -> Result<RequestDescriptor, NormalizedError> {
        RequestDescriptor::new(method, path)
            .with_json_body(input)
            .map_err(|e| {
                tracing::warn!(error = %e, path, "failed to encode request body");
                self.report(NormalizedError::new(
                    "The request could not be prepared. Please try again.",
                    None,
                    ErrorKind::Unknown,
                ))
            })
    }

    fn normalize(&self, failure: &Failure, status: u16, status_text: &str) -> NormalizedError {
        let err = normalize(failure, status, status_text, self.gate.is_logging_out());
        if let Failure::Network { detail } = failure {
            tracing::warn!(detail = %detail, "request failed before a response arrived");
        } else {
            tracing::warn!(status, kind = ?err.kind, message = %err.message, "request failed");
        }
        err
    }

    /// Show `err` unless the logout gate suppressed it. Returns it unchanged.
    fn report(&self, err: NormalizedError) -> NormalizedError {
        if err.suppressed {
            tracing::info!(kind = ?err.kind, "error suppressed during logout");
        } else {
            self.notifier.notify(&Toast::error(&err.message));
        }
        err
    }
}
