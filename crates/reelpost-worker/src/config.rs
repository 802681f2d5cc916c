//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use reelpost_models::Platform;
use tracing::warn;

use crate::poller::PollPolicy;
use crate::validation::ValidationPolicy;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Local scratch directory for staged copies
    pub scratch_dir: PathBuf,
    /// Wait before the first status check
    pub poll_initial_delay: Duration,
    /// Wait between status checks
    pub poll_interval: Duration,
    /// Status checks before giving up
    pub poll_max_attempts: u32,
    /// Overall limit for one platform's publish, if any
    pub publish_deadline: Option<Duration>,
    /// Platforms posted to by the drainer and the one-shot binary
    pub platforms: Vec<Platform>,
    /// Object-storage prefix of the upload queue
    pub queue_prefix: String,
    /// Where failed queue items are moved
    pub failed_prefix: String,
    /// Object-storage prefix for staged copies
    pub staging_prefix: String,
    /// How often the drainer looks at the queue
    pub drain_interval: Duration,
    /// Caption used when an asset has none
    pub default_caption: Option<String>,
    /// Run the media checklist before submission
    pub validate_media: bool,
    /// Accept videos without an audio stream
    pub allow_missing_audio: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            scratch_dir: PathBuf::from("/tmp/reelpost"),
            poll_initial_delay: Duration::from_secs(30),
            poll_interval: Duration::from_secs(20),
            poll_max_attempts: 30,
            publish_deadline: None,
            platforms: Platform::ALL.to_vec(),
            queue_prefix: "queue/".to_string(),
            failed_prefix: "failed/".to_string(),
            staging_prefix: "staging/".to_string(),
            drain_interval: Duration::from_secs(60),
            default_caption: None,
            validate_media: false,
            allow_missing_audio: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let platforms = match std::env::var("PUBLISH_PLATFORMS") {
            Ok(list) => match Platform::parse_list(&list) {
                Ok(platforms) if !platforms.is_empty() => platforms,
                Ok(_) => defaults.platforms.clone(),
                Err(e) => {
                    warn!("Ignoring PUBLISH_PLATFORMS: {}", e);
                    defaults.platforms.clone()
                }
            },
            Err(_) => defaults.platforms.clone(),
        };

        Self {
            scratch_dir: std::env::var("WORKER_SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
            poll_initial_delay: Duration::from_secs(
                std::env::var("POLL_INITIAL_DELAY_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            poll_interval: Duration::from_secs(
                std::env::var("POLL_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(20),
            ),
            poll_max_attempts: std::env::var("POLL_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(30),
            publish_deadline: std::env::var("PUBLISH_DEADLINE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            platforms,
            queue_prefix: prefix_var("QUEUE_PREFIX", &defaults.queue_prefix),
            failed_prefix: prefix_var("QUEUE_FAILED_PREFIX", &defaults.failed_prefix),
            staging_prefix: prefix_var("STAGING_PREFIX", &defaults.staging_prefix),
            drain_interval: Duration::from_secs(
                std::env::var("QUEUE_DRAIN_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            default_caption: std::env::var("DEFAULT_CAPTION")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            validate_media: std::env::var("VALIDATE_MEDIA")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            allow_missing_audio: std::env::var("VALIDATION_ALLOW_MISSING_AUDIO")
                .map(|v| !(v == "0" || v.eq_ignore_ascii_case("false")))
                .unwrap_or(true),
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            initial_delay: self.poll_initial_delay,
            interval: self.poll_interval,
            max_attempts: self.poll_max_attempts,
        }
    }

    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            allow_missing_audio: self.allow_missing_audio,
            ..ValidationPolicy::default()
        }
    }
}

/// Read a key prefix, normalised to end with `/`.
fn prefix_var(name: &str, default: &str) -> String {
    let value = std::env::var(name)
        .ok()
        .map(|s| s.trim().trim_start_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string());

    if value.ends_with('/') {
        value
    } else {
        format!("{}/", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_poll_policy() {
        let policy = WorkerConfig::default().poll_policy();
        assert_eq!(policy.initial_delay, Duration::from_secs(30));
        assert_eq!(policy.interval, Duration::from_secs(20));
        assert_eq!(policy.max_attempts, 30);
    }

    #[test]
    fn test_prefix_var_appends_slash() {
        assert_eq!(prefix_var("REELPOST_TEST_UNSET_PREFIX", "queue/"), "queue/");
    }

    #[test]
    fn test_validation_policy_follows_audio_flag() {
        let config = WorkerConfig {
            allow_missing_audio: false,
            ..Default::default()
        };
        assert!(!config.validation_policy().allow_missing_audio);
    }
}
