//! Progress events.
//!
//! Events are emitted at every phase transition of a publish attempt so a
//! caller can stream progress to an operator (chat, log, HTTP poller).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::platform::Platform;

/// Publish workflow phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishPhase {
    Validating,
    Staging,
    Submitting,
    Waiting,
    Polling,
    Finalizing,
    CleaningUp,
    Done,
    Failed,
}

impl PublishPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishPhase::Validating => "validating",
            PublishPhase::Staging => "staging",
            PublishPhase::Submitting => "submitting",
            PublishPhase::Waiting => "waiting",
            PublishPhase::Polling => "polling",
            PublishPhase::Finalizing => "finalizing",
            PublishPhase::CleaningUp => "cleaning_up",
            PublishPhase::Done => "done",
            PublishPhase::Failed => "failed",
        }
    }
}

/// A human-readable progress update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Platform the event concerns; `None` for shared steps like staging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    pub phase: PublishPhase,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(
        platform: Option<Platform>,
        phase: PublishPhase,
        message: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            phase,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn for_platform(
        platform: Platform,
        phase: PublishPhase,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Some(platform), phase, message)
    }

    pub fn shared(phase: PublishPhase, message: impl Into<String>) -> Self {
        Self::new(None, phase, message)
    }

    /// Text as shown to an operator, prefixed with the platform name.
    pub fn display_text(&self) -> String {
        match self.platform {
            Some(p) => format!("[{}] {}", p.display_name(), self.message),
            None => self.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = ProgressEvent::for_platform(
            Platform::Instagram,
            PublishPhase::CleaningUp,
            "Removing staged copy",
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["platform"], "instagram");
        assert_eq!(json["phase"], "cleaning_up");
        assert_eq!(event.display_text(), "[Instagram] Removing staged copy");
    }

    #[test]
    fn test_shared_event_omits_platform() {
        let event = ProgressEvent::shared(PublishPhase::Staging, "Uploading media");
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("platform").is_none());
        assert_eq!(event.display_text(), "Uploading media");
    }
}
