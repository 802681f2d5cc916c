//! Storage for staged media.
//!
//! This crate provides:
//! - The [`ObjectStore`] capability (put/get/list/delete blob by key)
//! - A Cloudflare R2 implementation over the S3 API
//! - An in-memory implementation for tests and local runs
//! - A local scratch directory with collision-free naming and housekeeping

pub mod client;
pub mod error;
pub mod memory;
pub mod scratch;
pub mod store;

pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryStore;
pub use scratch::{ScratchDir, ScratchUsage};
pub use store::{content_type_for_key, ObjectInfo, ObjectStore};
