//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{enqueue_upload, get_publish_status, health, list_queue, start_publish};
use crate::metrics::metrics_middleware;
use crate::middleware::{request_logging, require_api_key, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    // Trigger routes (require the API key when one is configured)
    let api_routes = Router::new()
        .route("/publish", post(start_publish))
        .route("/publish/:id", get(get_publish_status))
        .route("/uploads", post(enqueue_upload))
        .route("/queue", get(list_queue))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    let health_routes = Router::new().route("/health", get(health));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .route_layer(middleware::from_fn(metrics_middleware))
        // Raw uploads may be larger than axum's 2MB extractor default
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
