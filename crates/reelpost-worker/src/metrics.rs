//! Publish pipeline metrics.

use metrics::{counter, histogram};
use reelpost_models::{Platform, PublishResult};

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Publish outcomes by platform and outcome (`success` or the error kind).
    pub const PUBLISH_RESULTS_TOTAL: &str = "reelpost_publish_results_total";

    /// Publish duration in seconds by platform.
    pub const PUBLISH_DURATION_SECONDS: &str = "reelpost_publish_duration_seconds";

    /// Status checks by platform and observed status.
    pub const POLL_ATTEMPTS_TOTAL: &str = "reelpost_poll_attempts_total";

    /// Upload queue items handled by outcome.
    pub const QUEUE_ITEMS_TOTAL: &str = "reelpost_queue_items_total";

    /// Staging cleanups that left something behind.
    pub const CLEANUP_FAILURES_TOTAL: &str = "reelpost_cleanup_failures_total";
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record a finished publish.
pub fn record_publish_result(result: &PublishResult, duration_secs: f64) {
    let outcome = match result.error_kind {
        Some(kind) => kind.as_str(),
        None => "success",
    };

    counter!(
        names::PUBLISH_RESULTS_TOTAL,
        "platform" => result.platform.as_str(),
        "outcome" => outcome
    )
    .increment(1);

    histogram!(
        names::PUBLISH_DURATION_SECONDS,
        "platform" => result.platform.as_str()
    )
    .record(duration_secs);
}

/// Record one status check. `status` is `error` when the check itself failed.
pub fn record_poll_attempt(platform: Platform, status: &str) {
    counter!(
        names::POLL_ATTEMPTS_TOTAL,
        "platform" => platform.as_str(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a drained queue item (`published`, `failed` or `error`).
pub fn record_queue_item(outcome: &'static str) {
    counter!(names::QUEUE_ITEMS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_cleanup_failure() {
    counter!(names::CLEANUP_FAILURES_TOTAL).increment(1);
}
