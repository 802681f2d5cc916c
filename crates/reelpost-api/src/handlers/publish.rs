//! Publish trigger handlers.
//!
//! `POST /api/publish` starts a multi-platform publish in the background and
//! answers immediately; `GET /api/publish/:id` returns the progress events
//! collected so far and, once finished, the per-platform results.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{error, info};

use reelpost_models::{MediaAsset, MediaKind, Platform};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;
use crate::tracker::{PublishStatus, PublishTracker};

// ============================================================================
// Types
// ============================================================================

/// Publish request body. Exactly one of `video_url` and `image_url` is set.
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    /// Target platforms; empty means every configured platform
    #[serde(default)]
    pub platforms: Vec<String>,
}

/// Response for an accepted publish request.
#[derive(Debug, Serialize)]
pub struct PublishAccepted {
    pub request_id: String,
    pub platforms: Vec<Platform>,
    pub status_url: String,
}

impl PublishRequest {
    fn asset(&self) -> ApiResult<MediaAsset> {
        let (url, kind) = match (&self.video_url, &self.image_url) {
            (Some(url), None) => (url, MediaKind::Video),
            (None, Some(url)) => (url, MediaKind::Photo),
            (Some(_), Some(_)) => {
                return Err(ApiError::bad_request("set only one of video_url and image_url"))
            }
            (None, None) => {
                return Err(ApiError::bad_request("video_url or image_url is required"))
            }
        };

        let url = url.trim();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ApiError::bad_request("media URL must be http(s)"));
        }

        let asset = MediaAsset::from_url(url, kind);
        Ok(match &self.caption {
            Some(caption) => asset.with_caption(caption.clone()),
            None => asset,
        })
    }

    /// Resolve requested platform names against the configured ones.
    fn targets(&self, configured: &[Platform]) -> ApiResult<Vec<Platform>> {
        if self.platforms.is_empty() {
            return Ok(configured.to_vec());
        }

        let mut targets = Vec::new();
        for name in &self.platforms {
            let platform: Platform = name
                .parse()
                .map_err(|e| ApiError::bad_request(format!("{}", e)))?;
            if !configured.contains(&platform) {
                return Err(ApiError::bad_request(format!(
                    "{} is not configured on this server",
                    platform.display_name()
                )));
            }
            if !targets.contains(&platform) {
                targets.push(platform);
            }
        }
        Ok(targets)
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Start publishing in the background.
pub async fn start_publish(
    State(state): State<AppState>,
    Json(request): Json<PublishRequest>,
) -> ApiResult<(StatusCode, Json<PublishAccepted>)> {
    let asset = request.asset()?;
    let platforms = request.targets(&state.publisher.platforms())?;
    if platforms.is_empty() {
        return Err(ApiError::bad_request("no platforms are configured"));
    }

    let request_id = state.tracker.start(platforms.clone());
    info!(
        request_id = %request_id,
        asset_id = %asset.id,
        platforms = ?platforms,
        "Accepted publish request"
    );
    metrics::record_publish_request(platforms.len());

    let tracker = state.tracker.clone();
    let publisher = state.publisher.clone();
    let id = request_id.clone();
    let targets = platforms.clone();
    let task = tokio::spawn(async move {
        let sink = tracker.sink(id.clone());
        let report = publisher.publish_to(&asset, &targets, &sink).await;
        info!(request_id = %id, "{}", report.summary());
        tracker.finish(&id, report);
    });
    tokio::spawn(watch_publish(state.tracker.clone(), request_id.clone(), task));

    Ok((
        StatusCode::ACCEPTED,
        Json(PublishAccepted {
            status_url: format!("/api/publish/{}", request_id),
            request_id,
            platforms,
        }),
    ))
}

/// Fail the tracked request if its publish task dies before reporting.
async fn watch_publish(tracker: Arc<PublishTracker>, request_id: String, task: JoinHandle<()>) {
    if let Err(e) = task.await {
        error!(request_id = %request_id, error = %e, "Publish task aborted");
        tracker.abort(&request_id, format!("Publish task aborted: {}", e));
    }
}

/// Progress and final results of a publish request.
pub async fn get_publish_status(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> ApiResult<Json<PublishStatus>> {
    state
        .tracker
        .get(&request_id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("publish request {}", request_id)))
}
