//! Upload queue handlers.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use reelpost_worker::QueueItem;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub file_id: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub key: String,
    pub size: usize,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub pending: usize,
    pub items: Vec<QueueItem>,
}

/// Store the raw request body in the upload queue.
pub async fn enqueue_upload(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    if query.file_id.trim().is_empty() {
        return Err(ApiError::bad_request("file_id is required"));
    }
    if body.is_empty() {
        return Err(ApiError::bad_request("upload body is empty"));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let size = body.len();
    let key = state.queue.enqueue(&query.file_id, body, &content_type).await?;
    metrics::record_upload_enqueued();

    Ok((StatusCode::CREATED, Json(UploadResponse { key, size })))
}

/// Pending queue items, oldest first.
pub async fn list_queue(State(state): State<AppState>) -> ApiResult<Json<QueueResponse>> {
    let items = state.queue.pending().await?;
    Ok(Json(QueueResponse {
        pending: items.len(),
        items,
    }))
}
