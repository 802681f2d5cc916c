//! Structured publish logging utilities.
//!
//! Provides consistent, structured logging for one platform's publish of
//! one asset, with tracing spans and contextual information.

use reelpost_models::{AssetId, Platform};
use tracing::{error, info, warn, Span};

/// Publish logger for structured logging with consistent formatting.
///
/// Every line carries the asset id and the target platform.
#[derive(Debug, Clone)]
pub struct JobLogger {
    asset_id: String,
    platform: Platform,
}

impl JobLogger {
    /// Create a new logger for publishing `asset_id` to `platform`.
    pub fn new(asset_id: &AssetId, platform: Platform) -> Self {
        Self {
            asset_id: asset_id.to_string(),
            platform,
        }
    }

    /// Log the start of a publish.
    pub fn log_start(&self, message: &str) {
        info!(
            asset_id = %self.asset_id,
            platform = %self.platform,
            "Publish started: {}", message
        );
    }

    /// Log a progress update during the publish.
    pub fn log_progress(&self, message: &str) {
        info!(
            asset_id = %self.asset_id,
            platform = %self.platform,
            "Publish progress: {}", message
        );
    }

    /// Log a warning during the publish.
    pub fn log_warning(&self, message: &str) {
        warn!(
            asset_id = %self.asset_id,
            platform = %self.platform,
            "Publish warning: {}", message
        );
    }

    /// Log an error during the publish.
    pub fn log_error(&self, message: &str) {
        error!(
            asset_id = %self.asset_id,
            platform = %self.platform,
            "Publish error: {}", message
        );
    }

    /// Log the completion of the publish.
    pub fn log_completion(&self, message: &str) {
        info!(
            asset_id = %self.asset_id,
            platform = %self.platform,
            "Publish completed: {}", message
        );
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Create a tracing span for this publish.
    ///
    /// `job_id` is recorded once the platform returned a handle.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "publish",
            asset_id = %self.asset_id,
            platform = %self.platform,
            job_id = tracing::field::Empty
        )
    }
}
