//! Publish outcomes.

use serde::{Deserialize, Serialize};

use crate::platform::Platform;

/// Classified failure reason for a publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Missing or placeholder credentials; nothing was sent
    ConfigError,
    /// Local scratch write or object-storage upload failed
    StagingError,
    /// Media checklist failed before submission
    ValidationError,
    /// Creating the remote job failed
    SubmissionError,
    /// Platform reported an explicit processing failure
    ProcessingFailed,
    /// Poll budget exhausted; the remote job may still be running
    ProcessingTimedOut,
    /// Processing succeeded but the publish call failed
    FinalizationError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConfigError => "ConfigError",
            ErrorKind::StagingError => "StagingError",
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::SubmissionError => "SubmissionError",
            ErrorKind::ProcessingFailed => "ProcessingFailed",
            ErrorKind::ProcessingTimedOut => "ProcessingTimedOut",
            ErrorKind::FinalizationError => "FinalizationError",
        }
    }

    /// Whether the remote side may hold an artifact that needs a human look.
    pub fn needs_attention(&self) -> bool {
        matches!(self, ErrorKind::ProcessingTimedOut | ErrorKind::FinalizationError)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of publishing one asset to one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResult {
    pub platform: Platform,
    pub success: bool,
    /// Published media id, present iff `success`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_media_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl PublishResult {
    pub fn succeeded(platform: Platform, platform_media_id: impl Into<String>) -> Self {
        Self {
            platform,
            success: true,
            platform_media_id: Some(platform_media_id.into()),
            error_kind: None,
            error_detail: None,
        }
    }

    pub fn failed(platform: Platform, kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            platform,
            success: false,
            platform_media_id: None,
            error_kind: Some(kind),
            error_detail: Some(detail.into()),
        }
    }

    /// One-line human summary, e.g. `instagram: published (1789)`.
    pub fn status_line(&self) -> String {
        match (&self.platform_media_id, &self.error_kind) {
            (Some(id), _) => format!("{}: published ({})", self.platform.display_name(), id),
            (None, Some(kind)) => format!(
                "{}: {} - {}",
                self.platform.display_name(),
                kind,
                self.error_detail.as_deref().unwrap_or("no detail")
            ),
            (None, None) => format!("{}: unknown outcome", self.platform.display_name()),
        }
    }
}
