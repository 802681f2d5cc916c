//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const API_REQUESTS_TOTAL: &str = "reelpost_api_requests_total";
    pub const API_REQUEST_DURATION_SECONDS: &str = "reelpost_api_request_duration_seconds";
    pub const API_REQUESTS_IN_FLIGHT: &str = "reelpost_api_requests_in_flight";

    // Trigger metrics
    pub const PUBLISH_REQUESTS_TOTAL: &str = "reelpost_api_publish_requests_total";
    pub const UPLOADS_ENQUEUED_TOTAL: &str = "reelpost_api_uploads_enqueued_total";
    pub const AUTH_FAILURES_TOTAL: &str = "reelpost_api_auth_failures_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::API_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::API_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a publish request accepted for background processing.
pub fn record_publish_request(platforms: usize) {
    let labels = [("platforms", platforms.to_string())];
    counter!(names::PUBLISH_REQUESTS_TOTAL, &labels).increment(1);
}

/// Record an upload stored in the queue.
pub fn record_upload_enqueued() {
    counter!(names::UPLOADS_ENQUEUED_TOTAL).increment(1);
}

/// Record a rejected API key.
pub fn record_auth_failure() {
    counter!(names::AUTH_FAILURES_TOTAL).increment(1);
}

/// Metrics middleware for HTTP requests.
///
/// Requests are labelled with the matched route template, so
/// `/api/publish/:id` stays one series regardless of the id.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    gauge!(names::API_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::API_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
