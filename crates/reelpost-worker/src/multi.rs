//! Multi-platform fan-out.
//!
//! The asset is staged once and the resulting [`StagedMedia`] is shared
//! read-only by one orchestrator per platform. Platforms run concurrently
//! and never share job state. Unstaging happens once, after every platform
//! finished.

use std::sync::Arc;

use futures::future::join_all;
use reelpost_http::HttpClient;
use reelpost_models::{
    AssetId, MediaAsset, Platform, ProgressEvent, PublishPhase, PublishResult, StagingRecord,
};
use reelpost_platforms::PlatformsConfig;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::validation::{FfprobeValidator, MediaValidator};
use crate::notify::NotificationSink;
use crate::orchestrator::Orchestrator;
use crate::staging::Staging;

/// Results of publishing one asset to several platforms.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReport {
    pub asset_id: AssetId,
    /// One result per platform, in configuration order
    pub results: Vec<PublishResult>,
}

impl PublishReport {
    pub fn successful(&self) -> Vec<Platform> {
        self.results.iter().filter(|r| r.success).map(|r| r.platform).collect()
    }

    pub fn failed(&self) -> Vec<&PublishResult> {
        self.results.iter().filter(|r| !r.success).collect()
    }

    pub fn all_succeeded(&self) -> bool {
        !self.results.is_empty() && self.results.iter().all(|r| r.success)
    }

    pub fn result_for(&self, platform: Platform) -> Option<&PublishResult> {
        self.results.iter().find(|r| r.platform == platform)
    }

    /// Human summary: successful platforms, failures with reasons and the
    /// success rate.
    pub fn summary(&self) -> String {
        let mut lines = vec!["Posting summary:".to_string()];

        let successful = self.successful();
        if !successful.is_empty() {
            let names: Vec<_> = successful.iter().map(|p| p.display_name()).collect();
            lines.push(format!("Successful: {}", names.join(", ")));
        }

        let failed = self.failed();
        if !failed.is_empty() {
            let reasons: Vec<_> = failed
                .iter()
                .map(|r| {
                    format!(
                        "{} ({})",
                        r.platform.display_name(),
                        r.error_detail.as_deref().unwrap_or("unknown error")
                    )
                })
                .collect();
            lines.push(format!("Failed: {}", reasons.join(", ")));
        }

        lines.push(format!(
            "Success rate: {}/{} platforms",
            successful.len(),
            self.results.len()
        ));
        lines.join("\n")
    }
}

/// Publishes one asset to several platforms.
pub struct MultiPlatformPublisher {
    orchestrators: Vec<Orchestrator>,
    staging: Arc<dyn Staging>,
}

impl MultiPlatformPublisher {
    pub fn new(orchestrators: Vec<Orchestrator>, staging: Arc<dyn Staging>) -> Self {
        Self { orchestrators, staging }
    }

    /// Build one orchestrator per configured platform.
    pub fn from_config(
        config: &WorkerConfig,
        platforms: &PlatformsConfig,
        http: &HttpClient,
        staging: Arc<dyn Staging>,
    ) -> Self {
        let validator: Option<Arc<dyn MediaValidator>> = if config.validate_media {
            Some(Arc::new(FfprobeValidator::new(config.validation_policy())))
        } else {
            None
        };

        let orchestrators = platforms
            .build_publishers(&config.platforms, http)
            .into_iter()
            .map(|publisher| {
                let orchestrator =
                    Orchestrator::new(publisher, Arc::clone(&staging), config.poll_policy())
                        .with_deadline(config.publish_deadline)
                        .with_default_caption(config.default_caption.clone());
                match &validator {
                    Some(v) => orchestrator.with_validator(Arc::clone(v)),
                    None => orchestrator,
                }
            })
            .collect();

        Self::new(orchestrators, staging)
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.orchestrators.iter().map(|o| o.platform()).collect()
    }

    pub async fn publish_all(
        &self,
        asset: &MediaAsset,
        notify: &dyn NotificationSink,
    ) -> PublishReport {
        self.publish_to(asset, &[], notify).await
    }

    /// Publish to the configured platforms listed in `only`; an empty list
    /// means every configured platform.
    pub async fn publish_to(
        &self,
        asset: &MediaAsset,
        only: &[Platform],
        notify: &dyn NotificationSink,
    ) -> PublishReport {
        let targets: Vec<&Orchestrator> = self
            .orchestrators
            .iter()
            .filter(|o| only.is_empty() || only.contains(&o.platform()))
            .collect();

        let platforms: Vec<Platform> = targets.iter().map(|o| o.platform()).collect();
        let names: Vec<_> = platforms.iter().map(|p| p.display_name()).collect();
        info!(asset_id = %asset.id, platforms = ?platforms, "Starting multi-platform publish");
        notify.notify(ProgressEvent::shared(
            PublishPhase::Staging,
            format!("Starting multi-platform posting to: {}", names.join(", ")),
        ));

        let preflight: Vec<WorkerResult<()>> =
            targets.iter().map(|o| o.preflight(asset.kind)).collect();

        let results = if preflight.iter().all(|r| r.is_err()) {
            // Nothing to stage for
            targets
                .iter()
                .zip(preflight)
                .filter_map(|(o, r)| r.err().map(|e| o.fail(asset, e, notify)))
                .collect()
        } else {
            self.stage_and_run(asset, &targets, preflight, notify).await
        };

        let report = PublishReport {
            asset_id: asset.id.clone(),
            results,
        };
        notify.notify(ProgressEvent::shared(
            if report.all_succeeded() {
                PublishPhase::Done
            } else {
                PublishPhase::Failed
            },
            report.summary(),
        ));
        report
    }

    async fn stage_and_run(
        &self,
        asset: &MediaAsset,
        targets: &[&Orchestrator],
        preflight: Vec<WorkerResult<()>>,
        notify: &dyn NotificationSink,
    ) -> Vec<PublishResult> {
        let mut record = StagingRecord::new(asset.id.clone());
        notify.notify(ProgressEvent::shared(PublishPhase::Staging, "Staging media"));

        let results = match self.staging.stage(asset, &mut record).await {
            Ok(staged) => {
                let metadata = asset.metadata();
                join_all(targets.iter().map(|o| o.run_staged(&staged, &metadata, notify))).await
            }
            Err(e) => {
                warn!(asset_id = %asset.id, "Staging failed: {}", e);
                let detail = e.detail();
                targets
                    .iter()
                    .zip(preflight)
                    .map(|(o, checked)| {
                        let err = checked
                            .err()
                            .unwrap_or_else(|| WorkerError::staging_failed(detail.clone()));
                        o.fail(asset, err, notify)
                    })
                    .collect()
            }
        };

        notify.notify(ProgressEvent::shared(PublishPhase::CleaningUp, "Cleaning up staged media"));
        let report = self.staging.unstage(&record).await;
        if !report.is_clean() {
            notify.notify(ProgressEvent::shared(
                PublishPhase::CleaningUp,
                format!("Cleanup incomplete: {}", report.errors.join("; ")),
            ));
        }

        results
    }
}
