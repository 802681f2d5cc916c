//! Media assets submitted for publishing.

use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a media asset.
///
/// Staged file names and object-storage keys are derived from this id, so
/// it must be unique per in-flight asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub String);

impl AssetId {
    /// Generate a new random asset ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing unique identifier (e.g. a chat file id).
    ///
    /// Characters that are unsafe in file names or storage keys are replaced
    /// with `_`.
    pub fn from_source(id: impl AsRef<str>) -> Self {
        let sanitized: String = id
            .as_ref()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        if sanitized.is_empty() {
            Self::new()
        } else {
            Self(sanitized)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of media being published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    #[default]
    Video,
    Photo,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Photo => "photo",
        }
    }

    /// Default MIME type when the source does not specify one.
    pub fn default_mime_type(&self) -> &'static str {
        match self {
            MediaKind::Video => "video/mp4",
            MediaKind::Photo => "image/jpeg",
        }
    }
}

/// Where the media bytes come from.
#[derive(Debug, Clone)]
pub enum MediaSource {
    /// A remote URL already reachable by the target platforms.
    Url(String),
    /// Raw bytes received from a chat or HTTP upload.
    Bytes(Bytes),
    /// A file already present on local disk.
    LocalFile(PathBuf),
    /// An object already held in object storage (e.g. a queued upload).
    StoredObject { key: String },
}

impl MediaSource {
    pub fn kind_str(&self) -> &'static str {
        match self {
            MediaSource::Url(_) => "url",
            MediaSource::Bytes(_) => "bytes",
            MediaSource::LocalFile(_) => "local_file",
            MediaSource::StoredObject { .. } => "stored_object",
        }
    }
}

/// A unit of media to publish.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    pub id: AssetId,
    pub source: MediaSource,
    pub kind: MediaKind,
    pub caption: Option<String>,
    pub mime_type: String,
}

impl MediaAsset {
    /// Create an asset from a public URL.
    pub fn from_url(url: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            id: AssetId::new(),
            source: MediaSource::Url(url.into()),
            kind,
            caption: None,
            mime_type: kind.default_mime_type().to_string(),
        }
    }

    /// Create an asset from raw bytes identified by a unique source id.
    pub fn from_bytes(
        source_id: &str,
        data: impl Into<Bytes>,
        mime_type: impl Into<String>,
    ) -> Self {
        let mime_type = mime_type.into();
        let kind = if mime_type.starts_with("image/") {
            MediaKind::Photo
        } else {
            MediaKind::Video
        };
        Self {
            id: AssetId::from_source(source_id),
            source: MediaSource::Bytes(data.into()),
            kind,
            caption: None,
            mime_type,
        }
    }

    /// Create an asset from an object already in storage.
    pub fn from_stored_object(key: impl Into<String>, mime_type: impl Into<String>) -> Self {
        let key = key.into();
        let mime_type = mime_type.into();
        let kind = if mime_type.starts_with("image/") {
            MediaKind::Photo
        } else {
            MediaKind::Video
        };
        let stem = key
            .rsplit('/')
            .next()
            .and_then(|name| name.split('.').next())
            .unwrap_or_default()
            .to_string();
        Self {
            id: AssetId::from_source(stem),
            source: MediaSource::StoredObject { key },
            kind,
            caption: None,
            mime_type,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        let caption = caption.into();
        self.caption = if caption.trim().is_empty() {
            None
        } else {
            Some(caption)
        };
        self
    }

    /// File extension used for staged copies of this asset.
    pub fn file_extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "video/mp4" => "mp4",
            "video/quicktime" => "mov",
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            _ => match self.kind {
                MediaKind::Video => "mp4",
                MediaKind::Photo => "jpg",
            },
        }
    }

    /// Metadata handed to the platform submitters.
    pub fn metadata(&self) -> PostMetadata {
        PostMetadata {
            caption: self.caption.clone(),
            kind: self.kind,
        }
    }
}

/// Post metadata sent alongside the media.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default)]
    pub kind: MediaKind,
}

impl PostMetadata {
    pub fn caption_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.caption.as_deref().unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_id_sanitizes_source() {
        let id = AssetId::from_source("BAACAgI/x:y z");
        assert_eq!(id.as_str(), "BAACAgI_x_y_z");
    }

    #[test]
    fn test_asset_id_empty_source_falls_back_to_uuid() {
        let id = AssetId::from_source("");
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn test_from_bytes_infers_kind() {
        let photo = MediaAsset::from_bytes("f1", vec![1u8, 2, 3], "image/png");
        assert_eq!(photo.kind, MediaKind::Photo);
        assert_eq!(photo.file_extension(), "png");

        let video = MediaAsset::from_bytes("f2", vec![1u8], "video/mp4");
        assert_eq!(video.kind, MediaKind::Video);
        assert_eq!(video.file_extension(), "mp4");
    }

    #[test]
    fn test_from_stored_object_derives_id_from_key() {
        let asset = MediaAsset::from_stored_object("queue/abc123.mp4", "video/mp4");
        assert_eq!(asset.id.as_str(), "abc123");
        assert!(matches!(
            asset.source,
            MediaSource::StoredObject { ref key } if key == "queue/abc123.mp4"
        ));
    }

    #[test]
    fn test_blank_caption_is_dropped() {
        let asset = MediaAsset::from_url("https://cdn.example.com/v.mp4", MediaKind::Video)
            .with_caption("   ");
        assert!(asset.caption.is_none());
        assert_eq!(asset.metadata().caption_or("default"), "default");
    }
}
