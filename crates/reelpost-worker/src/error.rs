//! Worker error types.

use reelpost_models::ErrorKind;
use reelpost_platforms::PlatformError;
use reelpost_storage::StorageError;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Staging failed: {0}")]
    StagingFailed(String),

    #[error("Media validation failed: {0}")]
    ValidationFailed(String),

    #[error("Submission failed: {0}")]
    SubmissionFailed(String),

    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Processing did not finish in time: {0}")]
    ProcessingTimedOut(String),

    #[error("Finalization failed: {0}")]
    FinalizationFailed(String),

    #[error("Queue operation failed: {0}")]
    QueueFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn staging_failed(msg: impl Into<String>) -> Self {
        Self::StagingFailed(msg.into())
    }

    pub fn validation_failed(msg: impl Into<String>) -> Self {
        Self::ValidationFailed(msg.into())
    }

    pub fn processing_failed(msg: impl Into<String>) -> Self {
        Self::ProcessingFailed(msg.into())
    }

    pub fn processing_timed_out(msg: impl Into<String>) -> Self {
        Self::ProcessingTimedOut(msg.into())
    }

    pub fn queue_failed(msg: impl Into<String>) -> Self {
        Self::QueueFailed(msg.into())
    }

    /// Classify an error raised while creating the remote job.
    pub fn from_submit(err: PlatformError) -> Self {
        if err.is_config_error() {
            Self::ConfigError(err.detail())
        } else {
            Self::SubmissionFailed(err.detail())
        }
    }

    /// Classify an error raised while publishing a processed job.
    pub fn from_finalize(err: PlatformError) -> Self {
        if err.is_config_error() {
            Self::ConfigError(err.detail())
        } else {
            Self::FinalizationFailed(err.detail())
        }
    }

    /// Error kind reported in the publish result.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::ConfigError(_) => ErrorKind::ConfigError,
            WorkerError::StagingFailed(_)
            | WorkerError::QueueFailed(_)
            | WorkerError::Storage(_)
            | WorkerError::Io(_) => ErrorKind::StagingError,
            WorkerError::ValidationFailed(_) => ErrorKind::ValidationError,
            WorkerError::SubmissionFailed(_) => ErrorKind::SubmissionError,
            WorkerError::ProcessingFailed(_) => ErrorKind::ProcessingFailed,
            WorkerError::ProcessingTimedOut(_) => ErrorKind::ProcessingTimedOut,
            WorkerError::FinalizationFailed(_) => ErrorKind::FinalizationError,
            WorkerError::Platform(e) if e.is_config_error() => ErrorKind::ConfigError,
            WorkerError::Platform(_) => ErrorKind::SubmissionError,
        }
    }

    /// Detail without the variant prefix, for the publish result.
    pub fn detail(&self) -> String {
        match self {
            WorkerError::ConfigError(msg)
            | WorkerError::StagingFailed(msg)
            | WorkerError::ValidationFailed(msg)
            | WorkerError::SubmissionFailed(msg)
            | WorkerError::ProcessingFailed(msg)
            | WorkerError::ProcessingTimedOut(msg)
            | WorkerError::FinalizationFailed(msg)
            | WorkerError::QueueFailed(msg) => msg.clone(),
            WorkerError::Platform(e) => e.detail(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelpost_models::Platform;

    #[test]
    fn test_submit_errors_split_config_from_submission() {
        let missing =
            PlatformError::missing_credentials(Platform::TikTok, "TIKTOK_ACCESS_TOKEN is not set");
        assert_eq!(WorkerError::from_submit(missing).kind(), ErrorKind::ConfigError);

        let rejected = PlatformError::submission("spam_risk_too_many_posts");
        let err = WorkerError::from_submit(rejected);
        assert_eq!(err.kind(), ErrorKind::SubmissionError);
        assert!(err.detail().contains("spam_risk_too_many_posts"));
    }

    #[test]
    fn test_finalize_errors_are_finalization_kind() {
        let err =
            WorkerError::from_finalize(PlatformError::finalization("Media ID is not available"));
        assert_eq!(err.kind(), ErrorKind::FinalizationError);
    }

    #[test]
    fn test_storage_errors_are_staging_kind() {
        let err: WorkerError = StorageError::upload_failed("bucket unreachable").into();
        assert_eq!(err.kind(), ErrorKind::StagingError);
    }
}
