//! API middleware.

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request, Response};
use axum::middleware::Next;
use axum::response::IntoResponse;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::metrics;
use crate::state::AppState;

/// Header carrying the shared API secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Reject requests whose `x-api-key` does not match the configured key.
///
/// When no key is configured every request passes.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let Some(expected) = state.config.api_key.as_deref() else {
        return next.run(request).await;
    };

    let provided = request.headers().get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
    match provided {
        Some(key) if constant_time_eq(key.as_bytes(), expected.as_bytes()) => {
            next.run(request).await
        }
        Some(_) => {
            warn!(path = %request.uri().path(), "Rejected request with invalid API key");
            metrics::record_auth_failure();
            ApiError::unauthorized("invalid API key").into_response()
        }
        None => {
            metrics::record_auth_failure();
            ApiError::unauthorized(format!("missing {} header", API_KEY_HEADER)).into_response()
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Add security headers to responses.
pub async fn security_headers(request: Request<Body>, next: Next) -> Response<Body> {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert("cache-control", HeaderValue::from_static("no-store"));
    response
}

/// Log each request with its status and latency.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    // Skip health check logging
    if path == "/health" {
        return response;
    }
    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "Request completed"
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(!constant_time_eq(b"secret", b"secreT"));
        assert!(!constant_time_eq(b"secret", b"secret-longer"));
    }
}
