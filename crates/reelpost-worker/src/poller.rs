//! Remote job status polling.
//!
//! The poller asks a platform for a job's status at a fixed interval until
//! the platform reports a terminal status, the attempt budget runs out, or
//! an optional deadline passes. Waits are `tokio` timers, so a long poll
//! only suspends the calling task.

use std::time::Duration;

use reelpost_models::{JobState, PublishJob};
use reelpost_platforms::{PlatformPublisher, StatusCheck};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::metrics::record_poll_attempt;

/// Polling cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait after submission before the first check
    pub initial_delay: Duration,
    /// Wait between checks
    pub interval: Duration,
    /// Checks before the job is declared timed out
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(30),
            interval: Duration::from_secs(20),
            max_attempts: 30,
        }
    }
}

/// How a poll ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The job can be finalized.
    Succeeded,
    /// The platform reported failure or expiry.
    Failed { detail: String },
    /// No terminal status within the budget or before the deadline.
    TimedOut { attempts: u32 },
}

/// Drives a [`PublishJob`] to a terminal state.
#[derive(Debug, Clone, Default)]
pub struct StatusPoller {
    policy: PollPolicy,
}

impl StatusPoller {
    pub fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Sleep for the initial delay. Returns `false` when the deadline
    /// arrives first.
    pub async fn wait_initial_delay(&self, deadline: Option<Instant>) -> bool {
        sleep_within(self.policy.initial_delay, deadline).await
    }

    /// Poll `job` until it reaches a terminal state.
    ///
    /// A failed status check is logged and consumes an attempt. No wait
    /// follows the final attempt. A job that is already terminal is left
    /// untouched and its state is reported as is.
    pub async fn poll(
        &self,
        publisher: &dyn PlatformPublisher,
        job: &mut PublishJob,
        deadline: Option<Instant>,
    ) -> PollOutcome {
        if job.is_terminal() {
            return outcome_for(job);
        }
        settle(job, JobState::Processing, None);

        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempts = 0;

        while attempts < max_attempts {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                info!(job_id = %job.job_id, attempts, "Poll deadline reached");
                break;
            }

            attempts += 1;
            job.record_attempt();

            let check = match deadline {
                Some(d) => {
                    let pending = publisher.check_status(&job.job_id);
                    match tokio::time::timeout_at(d, pending).await {
                        Ok(check) => check,
                        Err(_) => {
                            info!(
                                job_id = %job.job_id,
                                attempts,
                                "Poll deadline reached during status check"
                            );
                            break;
                        }
                    }
                }
                None => publisher.check_status(&job.job_id).await,
            };

            match check {
                Ok(StatusCheck::Finished) => {
                    record_poll_attempt(job.platform, "finished");
                    info!(job_id = %job.job_id, attempt = attempts, "Remote processing finished");
                    settle(job, JobState::Succeeded, None);
                    return PollOutcome::Succeeded;
                }
                Ok(StatusCheck::Failed { status, detail }) => {
                    record_poll_attempt(job.platform, "failed");
                    let detail = detail.unwrap_or(status);
                    warn!(
                        job_id = %job.job_id,
                        attempt = attempts,
                        detail = %detail,
                        "Remote processing failed"
                    );
                    settle(job, JobState::Failed, Some(&detail));
                    return PollOutcome::Failed { detail };
                }
                Ok(StatusCheck::Expired { detail }) => {
                    record_poll_attempt(job.platform, "expired");
                    let detail = detail.unwrap_or_else(|| "EXPIRED".to_string());
                    warn!(job_id = %job.job_id, attempt = attempts, "Remote job expired");
                    settle(job, JobState::Expired, Some(&detail));
                    return PollOutcome::Failed { detail };
                }
                Ok(StatusCheck::Processing(status)) => {
                    record_poll_attempt(job.platform, "processing");
                    debug!(
                        job_id = %job.job_id,
                        attempt = attempts,
                        max_attempts,
                        status = %status,
                        "Still processing"
                    );
                }
                Err(e) => {
                    record_poll_attempt(job.platform, "error");
                    warn!(job_id = %job.job_id, attempt = attempts, "Status check failed: {}", e);
                }
            }

            if attempts < max_attempts && !sleep_within(self.policy.interval, deadline).await {
                info!(job_id = %job.job_id, attempts, "Poll deadline reached while waiting");
                break;
            }
        }

        settle(
            job,
            JobState::TimedOut,
            Some(&format!("no terminal status after {} checks", attempts)),
        );
        PollOutcome::TimedOut { attempts }
    }
}

/// Sleep for `duration`, cut short by `deadline`. Returns `false` if the
/// deadline cut the sleep short.
async fn sleep_within(duration: Duration, deadline: Option<Instant>) -> bool {
    let wake = Instant::now() + duration;
    match deadline {
        Some(d) if d <= wake => {
            tokio::time::sleep_until(d).await;
            false
        }
        _ => {
            tokio::time::sleep_until(wake).await;
            true
        }
    }
}

fn settle(job: &mut PublishJob, state: JobState, detail: Option<&str>) {
    if let Err(e) = job.transition(state) {
        warn!(job_id = %job.job_id, "{}", e);
        return;
    }
    if let Some(detail) = detail {
        job.set_detail(detail);
    }
}

fn outcome_for(job: &PublishJob) -> PollOutcome {
    let detail = || job.detail.clone().unwrap_or_else(|| job.state.to_string());
    match job.state {
        JobState::Succeeded => PollOutcome::Succeeded,
        JobState::Failed | JobState::Expired => PollOutcome::Failed { detail: detail() },
        _ => PollOutcome::TimedOut {
            attempts: job.attempts_used,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reelpost_models::{Platform, PostMetadata, StagedMedia};
    use reelpost_platforms::{PlatformError, PlatformResult};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Replays scripted status checks, then reports `IN_PROGRESS` forever.
    struct Scripted {
        script: Mutex<VecDeque<PlatformResult<StatusCheck>>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(script: Vec<PlatformResult<StatusCheck>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PlatformPublisher for Scripted {
        fn platform(&self) -> Platform {
            Platform::Instagram
        }

        fn check_credentials(&self) -> PlatformResult<()> {
            Ok(())
        }

        async fn submit(
            &self,
            _media: &StagedMedia,
            _metadata: &PostMetadata,
        ) -> PlatformResult<String> {
            Ok("job-1".into())
        }

        async fn check_status(&self, _job_id: &str) -> PlatformResult<StatusCheck> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(StatusCheck::Processing("IN_PROGRESS".into())))
        }

        async fn finalize(&self, job_id: &str) -> PlatformResult<String> {
            Ok(job_id.to_string())
        }
    }

    fn poller(max_attempts: u32) -> StatusPoller {
        StatusPoller::new(PollPolicy {
            initial_delay: Duration::from_secs(30),
            interval: Duration::from_secs(20),
            max_attempts,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_processing_times_out_after_max_attempts() {
        let publisher = Scripted::new(vec![]);
        let mut job = PublishJob::new(Platform::Instagram, "job-1");
        let started = Instant::now();

        let outcome = poller(5).poll(&publisher, &mut job, None).await;

        assert_eq!(outcome, PollOutcome::TimedOut { attempts: 5 });
        assert_eq!(publisher.calls(), 5);
        assert_eq!(job.state, JobState::TimedOut);
        assert_eq!(job.attempts_used, 5);
        // Four waits between five checks, none after the last one
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(80) && elapsed < Duration::from_secs(81));
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_on_second_check() {
        let publisher = Scripted::new(vec![
            Ok(StatusCheck::Processing("IN_PROGRESS".into())),
            Ok(StatusCheck::Finished),
        ]);
        let mut job = PublishJob::new(Platform::Instagram, "job-1");

        let outcome = poller(10).poll(&publisher, &mut job, None).await;

        assert_eq!(outcome, PollOutcome::Succeeded);
        assert_eq!(publisher.calls(), 2);
        assert_eq!(job.state, JobState::Succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_status_carries_detail() {
        let publisher = Scripted::new(vec![Ok(StatusCheck::Failed {
            status: "ERROR".into(),
            detail: Some("Error: 2207026".into()),
        })]);
        let mut job = PublishJob::new(Platform::Instagram, "job-1");

        let outcome = poller(10).poll(&publisher, &mut job, None).await;

        assert_eq!(
            outcome,
            PollOutcome::Failed {
                detail: "Error: 2207026".into()
            }
        );
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(publisher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_is_failure_with_expired_state() {
        let publisher = Scripted::new(vec![Ok(StatusCheck::Expired { detail: None })]);
        let mut job = PublishJob::new(Platform::Instagram, "job-1");

        let outcome = poller(10).poll(&publisher, &mut job, None).await;

        assert!(matches!(outcome, PollOutcome::Failed { .. }));
        assert_eq!(job.state, JobState::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_errors_consume_attempts_without_aborting() {
        let publisher = Scripted::new(vec![
            Err(PlatformError::status_check("connection reset")),
            Err(PlatformError::status_check("connection reset")),
            Ok(StatusCheck::Finished),
        ]);
        let mut job = PublishJob::new(Platform::Instagram, "job-1");

        let outcome = poller(3).poll(&publisher, &mut job, None).await;

        assert_eq!(outcome, PollOutcome::Succeeded);
        assert_eq!(job.attempts_used, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_on_every_check_time_out() {
        let publisher = Scripted::new(vec![
            Err(PlatformError::status_check("boom")),
            Err(PlatformError::status_check("boom")),
        ]);
        let mut job = PublishJob::new(Platform::Instagram, "job-1");

        let outcome = poller(2).poll(&publisher, &mut job, None).await;

        assert_eq!(outcome, PollOutcome::TimedOut { attempts: 2 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cuts_poll_short() {
        let publisher = Scripted::new(vec![]);
        let mut job = PublishJob::new(Platform::Instagram, "job-1");
        let deadline = Instant::now() + Duration::from_secs(50);

        let outcome = poller(30).poll(&publisher, &mut job, Some(deadline)).await;

        // Checks at 0s, 20s and 40s; the next wait hits the deadline
        assert_eq!(outcome, PollOutcome::TimedOut { attempts: 3 });
        assert_eq!(publisher.calls(), 3);
        assert_eq!(job.state, JobState::TimedOut);
        assert!(Instant::now() >= deadline);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_job_is_never_polled_again() {
        let publisher = Scripted::new(vec![Ok(StatusCheck::Finished)]);
        let mut job = PublishJob::new(Platform::Instagram, "job-1");
        job.transition(JobState::Failed).unwrap();
        job.set_detail("rejected");

        let outcome = poller(5).poll(&publisher, &mut job, None).await;

        assert_eq!(
            outcome,
            PollOutcome::Failed {
                detail: "rejected".into()
            }
        );
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(publisher.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_delay_respects_deadline() {
        let poller = poller(1);
        assert!(poller.wait_initial_delay(None).await);

        let deadline = Instant::now() + Duration::from_secs(10);
        assert!(!poller.wait_initial_delay(Some(deadline)).await);
    }
}
