//! Staging records.
//!
//! A [`StagingRecord`] tracks the temporary footprint of one asset across
//! local scratch storage and object storage. [`StagedMedia`] is the
//! read-only view handed to platform submitters.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::media::{AssetId, MediaKind};

/// Temporary copies created while staging an asset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StagingRecord {
    pub asset_id: Option<AssetId>,
    /// Scratch file written for this asset
    pub local_path: Option<PathBuf>,
    /// Object-storage key uploaded for this asset
    pub remote_storage_key: Option<String>,
    /// Publicly fetchable URL, set once the remote upload completed
    pub public_url: Option<String>,
}

impl StagingRecord {
    pub fn new(asset_id: AssetId) -> Self {
        Self {
            asset_id: Some(asset_id),
            ..Default::default()
        }
    }

    /// A record for media that was already public; nothing to clean up.
    pub fn pass_through(asset_id: AssetId, public_url: impl Into<String>) -> Self {
        Self {
            asset_id: Some(asset_id),
            public_url: Some(public_url.into()),
            ..Default::default()
        }
    }

    /// Whether unstaging has anything to delete.
    pub fn has_temporary_copies(&self) -> bool {
        self.local_path.is_some() || self.remote_storage_key.is_some()
    }
}

/// Staged media as seen by a platform submitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedMedia {
    pub asset_id: AssetId,
    pub public_url: String,
    /// Local copy, when one exists (used for direct byte uploads)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    pub kind: MediaKind,
    pub mime_type: String,
}
