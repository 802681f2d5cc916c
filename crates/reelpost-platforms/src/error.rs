//! Platform error types.

use reelpost_http::HttpError;
use reelpost_models::{MediaKind, Platform};
use thiserror::Error;

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Errors that can occur while talking to a platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Missing, empty or placeholder credential. Raised before any network call.
    #[error("{platform} credentials missing: {detail}")]
    MissingCredentials { platform: Platform, detail: String },

    #[error("{platform} does not accept {} posts", .kind.as_str())]
    UnsupportedMedia { platform: Platform, kind: MediaKind },

    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Status check failed: {0}")]
    StatusCheck(String),

    #[error("Finalization failed: {0}")]
    Finalization(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlatformError {
    pub fn missing_credentials(platform: Platform, detail: impl Into<String>) -> Self {
        Self::MissingCredentials {
            platform,
            detail: detail.into(),
        }
    }

    pub fn submission(msg: impl Into<String>) -> Self {
        Self::Submission(msg.into())
    }

    pub fn status_check(msg: impl Into<String>) -> Self {
        Self::StatusCheck(msg.into())
    }

    pub fn finalization(msg: impl Into<String>) -> Self {
        Self::Finalization(msg.into())
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::UnexpectedResponse(msg.into())
    }

    pub fn is_config_error(&self) -> bool {
        matches!(self, PlatformError::MissingCredentials { .. })
    }

    /// Human-readable detail suitable for a notification.
    pub fn detail(&self) -> String {
        match self {
            PlatformError::Http(e) => e.to_string(),
            other => other.to_string(),
        }
    }
}
