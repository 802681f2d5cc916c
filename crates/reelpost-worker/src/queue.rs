//! Upload queue backed by object storage.
//!
//! Uploads are stored under the queue prefix and drained oldest first. An
//! item that every platform accepted is deleted; anything else is moved
//! under the failed prefix so it is never submitted twice by accident.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use reelpost_models::{AssetId, MediaAsset};
use reelpost_storage::{content_type_for_key, ObjectStore, ScratchDir};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::error::{WorkerError, WorkerResult};
use crate::metrics::record_queue_item;
use crate::multi::{MultiPlatformPublisher, PublishReport};
use crate::notify::NotificationSink;

/// Scratch files older than this are leftovers from a crashed run.
const SCRATCH_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// A pending upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub key: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The upload queue.
#[derive(Clone)]
pub struct UploadQueue {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    failed_prefix: String,
}

impl UploadQueue {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        prefix: impl Into<String>,
        failed_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            failed_prefix: failed_prefix.into(),
        }
    }

    /// Store an upload under `<prefix><file_id>.<ext>` and return its key.
    pub async fn enqueue(
        &self,
        file_id: &str,
        data: Bytes,
        content_type: &str,
    ) -> WorkerResult<String> {
        if data.is_empty() {
            return Err(WorkerError::queue_failed("upload is empty"));
        }

        let key = format!(
            "{}{}.{}",
            self.prefix,
            AssetId::from_source(file_id),
            extension_for(content_type)
        );
        let size = data.len();
        self.store.put(&key, data, content_type).await?;

        info!(key = %key, bytes = size, "Queued upload");
        Ok(key)
    }

    /// Pending items, oldest first. Items without a timestamp sort last.
    pub async fn pending(&self) -> WorkerResult<Vec<QueueItem>> {
        let mut items: Vec<QueueItem> = self
            .store
            .list(&self.prefix)
            .await?
            .into_iter()
            .filter(|o| !o.key.ends_with('/'))
            .map(|o| QueueItem {
                key: o.key,
                size: o.size,
                created_at: o.created_at,
            })
            .collect();

        items.sort_by(|a, b| match (a.created_at, b.created_at) {
            (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.key.cmp(&b.key)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.key.cmp(&b.key),
        });
        Ok(items)
    }

    pub async fn next(&self) -> WorkerResult<Option<QueueItem>> {
        Ok(self.pending().await?.into_iter().next())
    }

    /// Remove a published item.
    pub async fn complete(&self, item: &QueueItem) -> WorkerResult<()> {
        self.store.delete(&item.key).await?;
        Ok(())
    }

    /// Move an item under the failed prefix. Returns the new key.
    pub async fn fail(&self, item: &QueueItem) -> WorkerResult<String> {
        let name = item.key.strip_prefix(&self.prefix).unwrap_or(&item.key);
        let failed_key = format!("{}{}", self.failed_prefix, name);

        let data = self.store.get(&item.key).await?;
        self.store
            .put(&failed_key, data, content_type_for_key(&item.key))
            .await?;
        self.store.delete(&item.key).await?;

        warn!(key = %item.key, failed_key = %failed_key, "Moved queue item to failed");
        Ok(failed_key)
    }
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "video/quicktime" => "mov",
        "video/webm" => "webm",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "mp4",
    }
}

/// Periodically publishes the oldest queue item.
pub struct QueueDrainer {
    queue: UploadQueue,
    publisher: MultiPlatformPublisher,
    scratch: ScratchDir,
    notify: Arc<dyn NotificationSink>,
    interval: Duration,
    shutdown: watch::Sender<bool>,
}

impl QueueDrainer {
    pub fn new(
        queue: UploadQueue,
        publisher: MultiPlatformPublisher,
        scratch: ScratchDir,
        notify: Arc<dyn NotificationSink>,
        interval: Duration,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            queue,
            publisher,
            scratch,
            notify,
            interval,
            shutdown,
        }
    }

    /// Run until [`shutdown`](Self::shutdown) is called.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting queue drainer for {:?} every {}s",
            self.publisher.platforms(),
            self.interval.as_secs()
        );

        match self.scratch.purge_older_than(SCRATCH_MAX_AGE).await {
            Ok(0) => {}
            Ok(n) => info!("Purged {} stale scratch files", n),
            Err(e) => warn!("Failed to purge scratch directory: {}", e),
        }

        let mut shutdown_rx = self.shutdown.subscribe();
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping drainer");
                        break;
                    }
                }
                _ = interval.tick() => {
                    if let Err(e) = self.drain_once().await {
                        error!("Error draining queue: {}", e);
                    }
                }
            }
        }

        Ok(())
    }

    /// Publish the oldest item, if any.
    pub async fn drain_once(&self) -> WorkerResult<Option<PublishReport>> {
        let Some(item) = self.queue.next().await? else {
            return Ok(None);
        };

        info!(key = %item.key, "Publishing queued upload");
        let asset = MediaAsset::from_stored_object(&item.key, content_type_for_key(&item.key));
        let report = self.publisher.publish_all(&asset, self.notify.as_ref()).await;

        if report.all_succeeded() {
            self.queue.complete(&item).await?;
            record_queue_item("published");
        } else {
            self.queue.fail(&item).await?;
            record_queue_item("failed");
        }

        Ok(Some(report))
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}
