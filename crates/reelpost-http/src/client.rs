//! JSON HTTP client.
//!
//! Every call goes through [`with_retry`], so transient failures never
//! surface to callers unless the retry budget is exhausted.

use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{debug, info_span, Instrument};

use crate::error::{HttpError, HttpResult};
use crate::metrics::record_request;
use crate::retry::{with_retry, RetryConfig};

/// Maximum length of a raw body echoed into an error detail.
const MAX_DETAIL_LEN: usize = 500;

// =============================================================================
// Request Options
// =============================================================================

/// Request body variants.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// `application/x-www-form-urlencoded` parameters
    Form(Vec<(String, String)>),
    Json(Value),
    /// Raw payload with an explicit content type
    Raw { data: Bytes, content_type: String },
}

/// Options for a single logical request.
///
/// Cloned cheaply on every retry attempt (`Bytes` is reference counted).
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub bearer: Option<String>,
    pub body: RequestBody,
    /// Label used in logs and metrics (e.g. `instagram.create_container`)
    pub operation: String,
}

impl RequestOptions {
    pub fn new(method: Method, operation: impl Into<String>) -> Self {
        Self {
            method,
            query: Vec::new(),
            headers: Vec::new(),
            bearer: None,
            body: RequestBody::Empty,
            operation: operation.into(),
        }
    }

    pub fn get(operation: impl Into<String>) -> Self {
        Self::new(Method::GET, operation)
    }

    pub fn post(operation: impl Into<String>) -> Self {
        Self::new(Method::POST, operation)
    }

    pub fn put(operation: impl Into<String>) -> Self {
        Self::new(Method::PUT, operation)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn form<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = RequestBody::Form(
            params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn bytes(mut self, data: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        self.body = RequestBody::Raw {
            data: data.into(),
            content_type: content_type.into(),
        };
        self
    }
}

// =============================================================================
// Client
// =============================================================================

/// HTTP client returning JSON bodies, with retry on transient failures.
#[derive(Clone)]
pub struct HttpClient {
    http: Client,
    retry: RetryConfig,
}

impl HttpClient {
    /// Create a new client.
    pub fn new(retry: RetryConfig) -> HttpResult<Self> {
        let http = Client::builder()
            .timeout(retry.timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("reelpost/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                HttpError::invalid_request(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { http, retry })
    }

    /// Create from environment variables.
    pub fn from_env() -> HttpResult<Self> {
        Self::new(RetryConfig::from_env())
    }

    /// Issue a request and return the decoded JSON body.
    ///
    /// An empty 2xx body yields `Value::Null`; a non-JSON 2xx body yields
    /// `Value::String`. Non-2xx responses fail with [`HttpError::Status`]
    /// carrying the vendor's error message when one can be extracted.
    pub async fn request(&self, url: &str, options: &RequestOptions) -> HttpResult<Value> {
        let span = info_span!(
            "http_request",
            operation = %options.operation,
            method = %options.method
        );

        with_retry(&self.retry, &options.operation, || self.send_once(url, options))
            .instrument(span)
            .await
    }

    /// Download a body as raw bytes (GET).
    pub async fn get_bytes(&self, url: &str) -> HttpResult<Bytes> {
        let operation = "download";

        with_retry(&self.retry, operation, || async move {
            let start = Instant::now();
            let response = self.http.get(url).send().await.inspect_err(|_| {
                record_request(operation, 0, start.elapsed().as_millis() as f64);
            })?;
            let status = response.status();
            record_request(operation, status.as_u16(), start.elapsed().as_millis() as f64);

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(HttpError::status(status.as_u16(), extract_detail(&body)));
            }

            Ok(response.bytes().await?)
        })
        .await
    }

    async fn send_once(&self, url: &str, options: &RequestOptions) -> HttpResult<Value> {
        let mut builder = self.http.request(options.method.clone(), url);

        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = &options.bearer {
            builder = builder.bearer_auth(token);
        }
        builder = match &options.body {
            RequestBody::Empty => builder,
            RequestBody::Form(params) => builder.form(params),
            RequestBody::Json(body) => builder.json(body),
            RequestBody::Raw { data, content_type } => builder
                .header(reqwest::header::CONTENT_TYPE, content_type.as_str())
                .body(data.clone()),
        };

        let start = Instant::now();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                record_request(&options.operation, 0, start.elapsed().as_millis() as f64);
                return Err(e.into());
            }
        };

        let status = response.status();
        let body = response.text().await?;
        record_request(&options.operation, status.as_u16(), start.elapsed().as_millis() as f64);

        if !status.is_success() {
            let detail = extract_detail(&body);
            debug!(status = status.as_u16(), detail = %detail, "Request returned error status");
            return Err(HttpError::status(status.as_u16(), detail));
        }

        Ok(parse_body(&body))
    }
}

fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

/// Pull a human-readable message out of a vendor error payload.
///
/// Understands the Graph API (`error.message`), Google (`error.message`,
/// `error_description`), TikTok (`error.message` / `error.code`) and generic
/// `message` shapes. Falls back to the truncated raw body.
pub fn extract_detail(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let candidates = [
            json.pointer("/error/message"),
            json.get("message"),
            json.get("error_description"),
            json.pointer("/error/code"),
            json.get("error"),
        ];
        for candidate in candidates.into_iter().flatten() {
            match candidate {
                Value::String(s) if !s.is_empty() => return s.clone(),
                Value::Number(n) => return n.to_string(),
                _ => {}
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    trimmed.chars().take(MAX_DETAIL_LEN).collect()
}

// =============================================================================
// Tests
// =============================================================================
