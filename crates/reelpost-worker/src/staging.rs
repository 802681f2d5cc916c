//! Media staging pipeline.
//!
//! Staging turns a [`MediaAsset`] into a publicly fetchable URL:
//! - a public URL passes through untouched
//! - raw bytes are written to the scratch directory, then uploaded to
//!   object storage
//! - a caller's local file is uploaded to object storage (the file itself
//!   belongs to the caller and is never deleted)
//! - an object already in storage (an upload queue item) gets a URL for its
//!   existing key and stays where it is
//!
//! Every temporary copy is written into the [`StagingRecord`] before it is
//! created, so `unstage` can remove whatever exists even when staging
//! failed halfway.

use std::sync::Arc;

use async_trait::async_trait;
use reelpost_models::{MediaAsset, MediaSource, StagedMedia, StagingRecord};
use reelpost_storage::{ObjectStore, ScratchDir};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::error::{WorkerError, WorkerResult};
use crate::metrics::record_cleanup_failure;

/// What `unstage` removed and what it could not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub local_removed: bool,
    pub remote_removed: bool,
    pub errors: Vec<String>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Stage and unstage media.
#[async_trait]
pub trait Staging: Send + Sync {
    /// Make `asset` fetchable. Temporary copies are recorded in `record` as
    /// they are created.
    async fn stage(
        &self,
        asset: &MediaAsset,
        record: &mut StagingRecord,
    ) -> WorkerResult<StagedMedia>;

    /// Remove every temporary copy listed in `record`. Never fails; problems
    /// are returned in the report.
    async fn unstage(&self, record: &StagingRecord) -> CleanupReport;
}

/// Staging over a scratch directory and an object store.
pub struct MediaStager {
    scratch: ScratchDir,
    store: Arc<dyn ObjectStore>,
    prefix: String,
}

impl MediaStager {
    pub fn new(
        scratch: ScratchDir,
        store: Arc<dyn ObjectStore>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            scratch,
            store,
            prefix: prefix.into(),
        }
    }

    pub fn scratch(&self) -> &ScratchDir {
        &self.scratch
    }

    /// Name for this attempt's copies: the asset id plus a nonce, so a
    /// re-sent asset staged concurrently never collides with itself.
    fn staged_name(asset: &MediaAsset) -> String {
        let nonce = Uuid::new_v4().simple().to_string();
        format!("{}-{}.{}", asset.id, &nonce[..8], asset.file_extension())
    }

    fn staged(
        asset: &MediaAsset,
        public_url: String,
        local_path: Option<std::path::PathBuf>,
    ) -> StagedMedia {
        StagedMedia {
            asset_id: asset.id.clone(),
            public_url,
            local_path,
            kind: asset.kind,
            mime_type: asset.mime_type.clone(),
        }
    }
}

#[async_trait]
impl Staging for MediaStager {
    async fn stage(
        &self,
        asset: &MediaAsset,
        record: &mut StagingRecord,
    ) -> WorkerResult<StagedMedia> {
        match &asset.source {
            MediaSource::Url(url) => {
                let parsed = Url::parse(url).map_err(|e| {
                    WorkerError::staging_failed(format!("invalid media URL {}: {}", url, e))
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(WorkerError::staging_failed(format!(
                        "media URL must be http(s), got {}",
                        parsed.scheme()
                    )));
                }

                debug!(asset_id = %asset.id, "Media already public; staging skipped");
                record.public_url = Some(url.clone());
                Ok(Self::staged(asset, url.clone(), None))
            }
            MediaSource::Bytes(data) => {
                if data.is_empty() {
                    return Err(WorkerError::staging_failed("media is empty"));
                }

                let name = Self::staged_name(asset);
                let path = self.scratch.write(&name, data).await?;
                record.local_path = Some(path.clone());

                let key = format!("{}{}", self.prefix, name);
                record.remote_storage_key = Some(key.clone());
                let url = self
                    .store
                    .put(&key, data.clone(), &asset.mime_type)
                    .await
                    .map_err(|e| {
                        WorkerError::staging_failed(format!("upload of {} failed: {}", key, e))
                    })?;
                record.public_url = Some(url.clone());

                info!(asset_id = %asset.id, key = %key, bytes = data.len(), "Staged media");
                Ok(Self::staged(asset, url, Some(path)))
            }
            MediaSource::LocalFile(path) => {
                let key = format!("{}{}", self.prefix, Self::staged_name(asset));
                record.remote_storage_key = Some(key.clone());
                let url = self
                    .store
                    .put_file(&key, path, &asset.mime_type)
                    .await
                    .map_err(|e| {
                        WorkerError::staging_failed(format!(
                            "upload of {} failed: {}",
                            path.display(),
                            e
                        ))
                    })?;
                record.public_url = Some(url.clone());

                info!(asset_id = %asset.id, key = %key, "Staged local file");
                Ok(Self::staged(asset, url, Some(path.clone())))
            }
            MediaSource::StoredObject { key } => {
                let url = self.store.url_for(key).await?;
                record.public_url = Some(url.clone());

                debug!(asset_id = %asset.id, key = %key, "Using stored object");
                Ok(Self::staged(asset, url, None))
            }
        }
    }

    async fn unstage(&self, record: &StagingRecord) -> CleanupReport {
        let mut report = CleanupReport::default();

        if let Some(path) = &record.local_path {
            match self.scratch.remove(path).await {
                Ok(removed) => report.local_removed = removed,
                Err(e) => report
                    .errors
                    .push(format!("failed to remove {}: {}", path.display(), e)),
            }
        }

        if let Some(key) = &record.remote_storage_key {
            match self.store.delete(key).await {
                Ok(()) => report.remote_removed = true,
                Err(e) => report.errors.push(format!("failed to delete {}: {}", key, e)),
            }
        }

        if !report.is_clean() {
            record_cleanup_failure();
            for error in &report.errors {
                warn!(asset_id = ?record.asset_id, "Cleanup: {}", error);
            }
        }
        report
    }
}
