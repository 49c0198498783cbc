//! HTTP client for the API under test
//!
//! One call, one round trip: no retries, no caching. Transport failures come
//! back as [`TransportError`]; any HTTP status, 2xx or not, is a normal
//! [`Response`] the caller asserts against.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use petcontract_core::{Checks, Config, Failure};

/// Normalized response of one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    operation: String,
    status_code: u16,
    body: Option<Value>,
    text: String,
}

impl Response {
    /// Build from the raw body text; `body` is the parsed JSON, if any.
    #[must_use]
    pub fn new(operation: impl Into<String>, status_code: u16, text: impl Into<String>) -> Self {
        let text = text.into();
        let body = if text.trim().is_empty() {
            None
        } else {
            serde_json::from_str(&text).ok()
        };
        Self {
            operation: operation.into(),
            status_code,
            body,
            text,
        }
    }

    /// Operation label, e.g. "GET /pets/1"
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Parsed JSON body; `None` when empty or not JSON
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.as_ref().and_then(|b| b.get(name))
    }

    /// The JSON body, or the raw text as a JSON string when it is not JSON.
    #[must_use]
    pub fn body_or_text(&self) -> Value {
        self.body
            .clone()
            .unwrap_or_else(|| Value::String(self.text.clone()))
    }

    /// Start an assertion batch labelled with this response's operation.
    #[must_use]
    pub fn checks(&self) -> Checks {
        Checks::new(&self.operation)
    }
}

/// Failure to obtain any response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {message}")]
    Timeout { operation: String, message: String },
    #[error("connection failed: {message}")]
    Connect { operation: String, message: String },
    #[error("request failed: {message}")]
    Request { operation: String, message: String },
    #[error("Invalid header '{0}'")]
    InvalidHeader(String),
    #[error("HTTP client error: {0}")]
    Build(String),
}

impl TransportError {
    /// Operation that got no response; `None` for client setup errors.
    #[must_use]
    pub fn operation(&self) -> Option<&str> {
        match self {
            Self::Timeout { operation, .. }
            | Self::Connect { operation, .. }
            | Self::Request { operation, .. } => Some(operation),
            Self::InvalidHeader(_) | Self::Build(_) => None,
        }
    }

    /// Infrastructure failure attributed to the operation.
    #[must_use]
    pub fn into_failure(self) -> Failure {
        let operation = self.operation().unwrap_or("<client>").to_string();
        Failure::infrastructure(operation, self)
    }

    fn from_reqwest(operation: &str, e: &reqwest::Error) -> Self {
        let operation = operation.to_string();
        let message = e.to_string();
        if e.is_timeout() {
            Self::Timeout { operation, message }
        } else if e.is_connect() {
            Self::Connect { operation, message }
        } else {
            Self::Request { operation, message }
        }
    }
}

/// Blocking client bound to one base URL.
///
/// Cloning is cheap and clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpClient {
    /// # Errors
    ///
    /// Returns error if a default header is invalid, the timeout is zero, or the
    /// client fails to build.
    pub fn new(
        base_url: impl Into<String>,
        headers: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        if timeout.is_zero() {
            return Err(TransportError::Build("timeout must be non-zero".to_string()));
        }

        let mut default_headers = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| TransportError::InvalidHeader(name.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| TransportError::InvalidHeader(name.to_string()))?;
            default_headers.insert(name, value);
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// # Errors
    ///
    /// See [`HttpClient::new`].
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        Self::new(
            config.base_url.clone(),
            &config.headers,
            Duration::from_secs(config.timeout_secs),
        )
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve `endpoint` against the base URL.
    #[must_use]
    pub fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// GET with optional query parameters.
    ///
    /// # Errors
    ///
    /// Returns error if no response was obtained.
    pub fn get(
        &self,
        endpoint: &str,
        params: Option<&[(&str, &str)]>,
    ) -> Result<Response, TransportError> {
        let mut operation = operation_label(&Method::GET, endpoint);
        let mut req = self.client.get(self.url(endpoint));
        if let Some(params) = params.filter(|p| !p.is_empty()) {
            let query: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
            operation = format!("{operation}?{}", query.join("&"));
            req = req.query(params);
        }
        self.send(&operation, req)
    }

    /// POST a JSON body.
    ///
    /// # Errors
    ///
    /// Returns error if no response was obtained.
    pub fn post(&self, endpoint: &str, body: &Value) -> Result<Response, TransportError> {
        let operation = operation_label(&Method::POST, endpoint);
        self.send(&operation, self.client.post(self.url(endpoint)).json(body))
    }

    /// PATCH a JSON body.
    ///
    /// # Errors
    ///
    /// Returns error if no response was obtained.
    pub fn patch(&self, endpoint: &str, body: &Value) -> Result<Response, TransportError> {
        let operation = operation_label(&Method::PATCH, endpoint);
        self.send(&operation, self.client.patch(self.url(endpoint)).json(body))
    }

    fn send(
        &self,
        operation: &str,
        req: reqwest::blocking::RequestBuilder,
    ) -> Result<Response, TransportError> {
        tracing::debug!(operation, "sending request");
        let start = Instant::now();

        let resp = req.send().map_err(|e| {
            tracing::warn!(operation, error = %e, "no response");
            TransportError::from_reqwest(operation, &e)
        })?;
        let status_code = resp.status().as_u16();
        let text = resp
            .text()
            .map_err(|e| TransportError::from_reqwest(operation, &e))?;

        tracing::debug!(
            operation,
            status_code,
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "received response"
        );
        Ok(Response::new(operation, status_code, text))
    }
}

fn operation_label(method: &Method, endpoint: &str) -> String {
    format!("{method} /{}", endpoint.trim_start_matches('/'))
}
