//! Axum HTTP trigger surface.
//!
//! This crate provides:
//! - Publish triggers with per-request progress tracking
//! - Upload queue intake and listing
//! - Shared-key authentication and security headers
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod tracker;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
pub use tracker::{PublishStatus, PublishTracker, RequestState};
