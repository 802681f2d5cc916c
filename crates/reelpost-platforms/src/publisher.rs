//! Platform publisher interface.

use async_trait::async_trait;
use bytes::Bytes;
use reelpost_http::HttpClient;
use reelpost_models::{MediaKind, Platform, PostMetadata, StagedMedia};

use crate::error::{PlatformError, PlatformResult};

/// One status observation of a remote job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCheck {
    /// Still processing; carries the raw platform status (e.g. `IN_PROGRESS`).
    Processing(String),
    /// Processing finished, the job can be finalized.
    Finished,
    /// Platform reported an explicit failure.
    Failed { status: String, detail: Option<String> },
    /// Platform reported the job expired.
    Expired { detail: Option<String> },
}

impl StatusCheck {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StatusCheck::Processing(_))
    }
}

/// Submit / status / finalize operations of one platform.
///
/// Submission is not idempotent: every successful call may create a new
/// remote job, so callers must not retry it blindly.
#[async_trait]
pub trait PlatformPublisher: Send + Sync {
    fn platform(&self) -> Platform;

    /// Fail fast on missing or placeholder credentials.
    fn check_credentials(&self) -> PlatformResult<()>;

    /// Whether the platform accepts this kind of media.
    fn supports(&self, kind: MediaKind) -> bool {
        kind == MediaKind::Video
    }

    /// Create the remote processing job and return its handle.
    async fn submit(&self, media: &StagedMedia, metadata: &PostMetadata) -> PlatformResult<String>;

    /// Query the job once.
    async fn check_status(&self, job_id: &str) -> PlatformResult<StatusCheck>;

    /// Make the processed job public and return the published media id.
    async fn finalize(&self, job_id: &str) -> PlatformResult<String>;

    /// Public link for a published media id, when the platform has one.
    fn media_url(&self, _media_id: &str) -> Option<String> {
        None
    }
}

/// Reject media kinds the publisher cannot post.
pub(crate) fn ensure_supported(
    publisher: &dyn PlatformPublisher,
    kind: MediaKind,
) -> PlatformResult<()> {
    if publisher.supports(kind) {
        Ok(())
    } else {
        Err(PlatformError::UnsupportedMedia {
            platform: publisher.platform(),
            kind,
        })
    }
}

/// Load the media bytes for a direct upload: the local copy when one
/// exists, else a download of the public URL.
pub(crate) async fn load_media_bytes(
    http: &HttpClient,
    media: &StagedMedia,
) -> PlatformResult<Bytes> {
    let data = match &media.local_path {
        Some(path) => Bytes::from(tokio::fs::read(path).await?),
        None => http.get_bytes(&media.public_url).await?,
    };

    if data.is_empty() {
        return Err(PlatformError::submission("media is empty"));
    }
    Ok(data)
}
