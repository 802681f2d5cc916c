//! HTTP client with retry for platform API calls.
//!
//! Provides:
//! - A JSON-returning request helper for GET/POST/PUT with form, JSON or raw bodies
//! - Exponential backoff on transient failures (429, timeouts, resets)
//! - Error detail extraction from vendor error payloads
//! - Request and retry metrics

pub mod client;
pub mod error;
pub mod metrics;
pub mod retry;

pub use client::{HttpClient, RequestBody, RequestOptions};
pub use error::{HttpError, HttpResult};
pub use retry::{with_retry, RetryConfig};
