//! Retry policy with exponential backoff.
//!
//! - `max_attempts` counts every attempt, the first one included
//! - after failed attempt `n` the delay is `base_delay * 2^n`
//! - only errors classified transient by [`HttpError::is_transient`] are retried

use std::future::Future;
use std::time::Duration;

use tracing::{info_span, warn, Instrument};

use crate::error::{HttpError, HttpResult};
use crate::metrics::record_retry;

// =============================================================================
// Configuration
// =============================================================================

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Base delay for exponential backoff (in milliseconds).
    pub base_delay_ms: u64,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            timeout: Duration::from_secs(120),
        }
    }
}

impl RetryConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_attempts: u32 = std::env::var("HTTP_RETRY_MAX_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_attempts);

        let base_delay_ms: u64 = std::env::var("HTTP_RETRY_BASE_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.base_delay_ms);

        let timeout_secs: u64 = std::env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.timeout.as_secs());

        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Config with a tiny base delay, for tests against mock servers.
    pub fn fast(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 1,
            timeout: Duration::from_secs(5),
        }
    }

    /// Delay to wait after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

// =============================================================================
// Retry Loop
// =============================================================================

/// Execute an async operation with retry.
///
/// Retries on transient errors (429, timeouts, network failures,
/// "temporarily unavailable"). Everything else is returned immediately.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: &str, op: F) -> HttpResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = HttpResult<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let span = info_span!("http_retry", operation = %operation, attempt);

        match op().instrument(span).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = config.delay_after(attempt);

                warn!(
                    operation = %operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Request failed, retrying: {}",
                    e
                );

                record_retry(operation);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) if e.is_transient() => return Err(exhausted(e, attempt)),
            Err(e) => return Err(e),
        }
    }
}

fn exhausted(e: HttpError, attempts: u32) -> HttpError {
    match e {
        HttpError::Network(msg) => {
            HttpError::Network(format!("{} (after {} attempts)", msg, attempts))
        }
        other => other,
    }
}

// =============================================================================
// Tests
// =============================================================================
