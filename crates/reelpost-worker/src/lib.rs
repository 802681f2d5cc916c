//! Publish pipeline worker.
//!
//! This crate provides:
//! - Media staging with guaranteed cleanup
//! - Status polling with bounded attempts and an optional deadline
//! - The per-platform orchestrator and multi-platform fan-out
//! - Progress notification sinks
//! - The object-storage upload queue and its drainer
//! - A pluggable media checklist

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod multi;
pub mod notify;
pub mod orchestrator;
pub mod poller;
pub mod queue;
pub mod staging;
pub mod validation;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use multi::{MultiPlatformPublisher, PublishReport};
pub use notify::{ChannelSink, LogSink, NotificationSink};
pub use orchestrator::Orchestrator;
pub use poller::{PollOutcome, PollPolicy, StatusPoller};
pub use queue::{QueueDrainer, QueueItem, UploadQueue};
pub use staging::{CleanupReport, MediaStager, Staging};
pub use validation::{FfprobeValidator, MediaValidator, ValidationPolicy};
