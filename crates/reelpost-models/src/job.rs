//! Remote publish jobs.
//!
//! A [`PublishJob`] tracks one outstanding unit of processing at a platform.
//! Its state only ever moves forward; once a terminal state is reached the
//! job is frozen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::platform::Platform;

/// Remote job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Job handle returned by the platform, not yet checked
    #[default]
    Created,
    /// Platform reports the job is still being processed
    Processing,
    /// Platform finished processing
    Succeeded,
    /// Platform reported an explicit failure
    Failed,
    /// Platform reported the job expired before it could be published
    Expired,
    /// Poll budget exhausted without a terminal signal
    TimedOut,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Created => "created",
            JobState::Processing => "processing",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
            JobState::Expired => "expired",
            JobState::TimedOut => "timed_out",
        }
    }

    /// Check if this is a terminal state (no more transitions allowed).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::Expired | JobState::TimedOut
        )
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        match self {
            JobState::Created => next != JobState::Created,
            JobState::Processing => next != JobState::Created,
            _ => false,
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rejected state transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid job transition {from} -> {to}")]
pub struct TransitionError {
    pub from: JobState,
    pub to: JobState,
}

/// One outstanding unit of work at a remote platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishJob {
    /// Opaque platform job handle (container id, video id, publish id)
    pub job_id: String,
    pub platform: Platform,
    pub state: JobState,
    /// Number of status checks consumed so far
    pub attempts_used: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Last status string or failure detail reported by the platform
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl PublishJob {
    /// Create a job for a freshly submitted handle.
    pub fn new(platform: Platform, job_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            job_id: job_id.into(),
            platform,
            state: JobState::Created,
            attempts_used: 0,
            created_at: now,
            updated_at: now,
            detail: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Move the job to `next`.
    ///
    /// Re-entering `Processing` while processing is allowed (it refreshes
    /// `updated_at`). Any transition out of a terminal state is rejected
    /// and leaves the job untouched.
    pub fn transition(&mut self, next: JobState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(next) {
            return Err(TransitionError {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record one consumed status check.
    pub fn record_attempt(&mut self) {
        self.attempts_used = self.attempts_used.saturating_add(1);
        self.updated_at = Utc::now();
    }

    pub fn set_detail(&mut self, detail: impl Into<String>) {
        self.detail = Some(detail.into());
    }
}
