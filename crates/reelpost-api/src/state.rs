//! Application state.

use std::sync::Arc;

use reelpost_http::HttpClient;
use reelpost_platforms::PlatformsConfig;
use reelpost_storage::{R2Client, ScratchDir};
use reelpost_worker::{MediaStager, MultiPlatformPublisher, UploadQueue, WorkerConfig};
use tracing::warn;

use crate::config::ApiConfig;
use crate::tracker::PublishTracker;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub publisher: Arc<MultiPlatformPublisher>,
    pub queue: UploadQueue,
    pub tracker: Arc<PublishTracker>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let worker_config = WorkerConfig::from_env();

        let storage = Arc::new(R2Client::from_env()?);
        if let Err(e) = storage.check_connectivity().await {
            warn!("Storage connectivity check failed: {}", e);
        }

        let scratch = ScratchDir::new(&worker_config.scratch_dir);
        scratch.ensure().await?;

        let http = HttpClient::from_env()?;
        let staging = Arc::new(MediaStager::new(
            scratch,
            storage.clone(),
            worker_config.staging_prefix.clone(),
        ));
        let publisher = MultiPlatformPublisher::from_config(
            &worker_config,
            &PlatformsConfig::from_env(),
            &http,
            staging,
        );
        let queue = UploadQueue::new(
            storage,
            worker_config.queue_prefix,
            worker_config.failed_prefix,
        );

        Ok(Self::from_parts(config, publisher, queue))
    }

    pub fn from_parts(
        config: ApiConfig,
        publisher: MultiPlatformPublisher,
        queue: UploadQueue,
    ) -> Self {
        Self {
            config,
            publisher: Arc::new(publisher),
            queue,
            tracker: Arc::new(PublishTracker::new()),
        }
    }
}
