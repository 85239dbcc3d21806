//! The only place that touches the network.
//!
//! `Transport` executes a plain-data `HttpRequest` and hands back a plain-data
//! `HttpResponse`. Any status, including 4xx/5xx, is a response; only failing
//! to get a response at all is an error.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use crate::config::ClientConfig;
use crate::error::{ConfigError, TransportError};
use crate::http::{FormData, FormValue, HttpMethod, HttpRequest, HttpResponse, RequestBody};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// `reqwest`-backed transport with a cookie store, so session cookies set by
/// the backend are sent on every later request.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder().cookie_store(true);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder
            .build()
            .map_err(|e| ConfigError::ClientBuild(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        builder = match request.body {
            Some(RequestBody::Json(value)) => {
                let body = serde_json::to_vec(&value)
                    .map_err(|e| TransportError::Request(e.to_string()))?;
                builder.body(body)
            }
            Some(RequestBody::Form(form)) => builder.multipart(to_multipart(form)?),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = response.text().await?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Head => reqwest::Method::HEAD,
        HttpMethod::Options => reqwest::Method::OPTIONS,
    }
}

fn to_multipart(form: FormData) -> Result<Form, TransportError> {
    let mut out = Form::new();
    for field in form.fields {
        out = match field.value {
            FormValue::Text(text) => out.text(field.name, text),
            FormValue::File {
                file_name,
                content_type,
                bytes,
            } => {
                let mut part = Part::bytes(bytes).file_name(file_name);
                if let Some(content_type) = content_type {
                    part = part
                        .mime_str(&content_type)
                        .map_err(|e| TransportError::Request(e.to_string()))?;
                }
                out.part(field.name, part)
            }
        };
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn builds_with_timeout_and_user_agent() {
        let config = ClientConfig::new("http://localhost:3000")
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("lms-core-test");
        assert!(ReqwestTransport::new(&config).is_ok());
    }

    #[test]
    fn methods_map_one_to_one() {
        assert_eq!(to_reqwest_method(HttpMethod::Patch), reqwest::Method::PATCH);
        assert_eq!(to_reqwest_method(HttpMethod::Options), reqwest::Method::OPTIONS);
    }

    #[test]
    fn invalid_file_mime_is_rejected() {
        let form = FormData::new().file("upload", "a.bin", Some("not a mime"), vec![1, 2, 3]);
        assert!(matches!(to_multipart(form), Err(TransportError::Request(_))));
    }
}
