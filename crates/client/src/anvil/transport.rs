//! Network transport for the request pipeline.
//!
//! The pipeline only needs "send this request, give me status, retry-after and
//! body". [`HttpTransport`] does that over reqwest; tests script their own.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use url::Url;

use crate::anvil::{AnvilError, ApiRequest};

/// Credential header names. The API only accepts them lowercase.
pub const APP_KEY_HEADER: &str = "x-application-key";
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Status, rate-limit hint and body of one completed exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    /// Raw `Retry-After` header value, if any.
    pub retry_after: Option<String>,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, retry_after: None, body: body.into() }
    }

    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub fn with_retry_after(mut self, value: impl Into<String>) -> Self {
        self.retry_after = Some(value.into());
        self
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// One network attempt.
///
/// Errors must be [`AnvilError::Timeout`] or [`AnvilError::Transport`] for
/// failures that happen before a response arrives; any status code, including
/// errors, is returned as `Ok`.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn send(&self, req: &ApiRequest) -> Result<RawResponse, AnvilError>;
}

/// reqwest-backed transport with credential headers attached to every call.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(
        base_url: &str, app_key: &str, user_token: &str, user_agent: &str, timeout: Duration,
    ) -> Result<Self, AnvilError> {
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(APP_KEY_HEADER), sensitive(app_key)?);
        headers.insert(HeaderName::from_static(AUTH_TOKEN_HEADER), sensitive(user_token)?);
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .timeout(timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| AnvilError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string() })
    }

    /// Absolute URL for an API path.
    pub fn endpoint(&self, path: &str) -> Result<Url, AnvilError> {
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{}/{}", self.base_url, path)).map_err(|e| AnvilError::InvalidUrl(e.to_string()))
    }
}

fn sensitive(value: &str) -> Result<HeaderValue, AnvilError> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|_| AnvilError::MissingCredentials("credential contains invalid header characters".into()))?;
    value.set_sensitive(true);
    Ok(value)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, req: &ApiRequest) -> Result<RawResponse, AnvilError> {
        let url = self.endpoint(&req.path)?;

        let mut builder = self.http.request(req.method.into(), url);
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        Ok(RawResponse { status, retry_after, body })
    }
}
