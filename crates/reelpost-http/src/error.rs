//! HTTP error types.

use thiserror::Error;

/// Result type for HTTP operations.
pub type HttpResult<T> = Result<T, HttpError>;

/// Errors that can occur while talking to a remote API.
#[derive(Debug, Clone, Error)]
pub enum HttpError {
    /// Remote answered with a non-2xx status.
    #[error("HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Connection refused/reset or other transport failure.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl HttpError {
    pub fn status(status: u16, detail: impl Into<String>) -> Self {
        Self::Status {
            status,
            detail: detail.into(),
        }
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Check if the failure is likely to succeed on retry.
    ///
    /// Transient: HTTP 429, timeouts, transport failures, and any error whose
    /// detail mentions "temporarily unavailable".
    pub fn is_transient(&self) -> bool {
        match self {
            HttpError::Status { status: 429, .. } => true,
            HttpError::Status { detail, .. } => mentions_temporarily_unavailable(detail),
            HttpError::Timeout(_) | HttpError::Network(_) => true,
            HttpError::Decode(_) | HttpError::InvalidRequest(_) => false,
        }
    }

    /// HTTP status code, when the remote answered.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            HttpError::Timeout(_) => Some(408),
            _ => None,
        }
    }

    /// Human-readable detail without the status prefix.
    pub fn detail(&self) -> String {
        match self {
            HttpError::Status { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}

fn mentions_temporarily_unavailable(detail: &str) -> bool {
    detail.to_lowercase().contains("temporarily unavailable")
}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            HttpError::Timeout(e.to_string())
        } else if e.is_builder() {
            HttpError::InvalidRequest(e.to_string())
        } else if e.is_decode() {
            HttpError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            HttpError::status(status.as_u16(), e.to_string())
        } else {
            HttpError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for HttpError {
    fn from(e: serde_json::Error) -> Self {
        HttpError::Decode(e.to_string())
    }
}
