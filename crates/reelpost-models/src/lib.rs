//! Shared data models for the reelpost publishing pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Target platforms and media assets
//! - Staging records for temporary media copies
//! - Remote publish jobs and their state machine
//! - Publish results and error kinds
//! - Progress events streamed to a notification sink

pub mod event;
pub mod job;
pub mod media;
pub mod platform;
pub mod result;
pub mod staging;

// Re-export common types
pub use event::{ProgressEvent, PublishPhase};
pub use job::{JobState, PublishJob, TransitionError};
pub use media::{AssetId, MediaAsset, MediaKind, MediaSource, PostMetadata};
pub use platform::{Platform, UnknownPlatform};
pub use result::{ErrorKind, PublishResult};
pub use staging::{StagedMedia, StagingRecord};
