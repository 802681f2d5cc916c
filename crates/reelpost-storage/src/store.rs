//! Object storage capability.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::{StorageError, StorageResult};

/// Information about a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Object key
    pub key: String,
    /// Size in bytes
    pub size: u64,
    /// Creation (last modified) time, when the backend reports one
    pub created_at: Option<DateTime<Utc>>,
}

/// Blob storage addressed by key.
///
/// Implementations must be safe to share between concurrent publish tasks.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key` and return a URL the platforms can fetch.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<String>;

    /// Store a local file under `key` and return a fetchable URL.
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> StorageResult<String> {
        let data = tokio::fs::read(path).await?;
        self.put(key, Bytes::from(data), content_type).await
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// List objects whose key starts with `prefix`.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>>;

    /// Delete an object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Publicly fetchable URL for an existing key.
    async fn url_for(&self, key: &str) -> StorageResult<String>;
}

/// Validate a key before it reaches a backend.
pub(crate) fn check_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.starts_with('/') || key.split('/').any(|seg| seg == "..") {
        return Err(StorageError::invalid_key(key));
    }
    Ok(())
}

/// Guess a content type from a key's extension.
pub fn content_type_for_key(key: &str) -> &'static str {
    let ext = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for_key() {
        assert_eq!(content_type_for_key("queue/abc.mp4"), "video/mp4");
        assert_eq!(content_type_for_key("queue/abc.MOV"), "video/quicktime");
        assert_eq!(content_type_for_key("queue/pic.jpeg"), "image/jpeg");
        assert_eq!(content_type_for_key("queue/noext"), "application/octet-stream");
    }

    #[test]
    fn test_check_key() {
        assert!(check_key("staging/a.mp4").is_ok());
        assert!(check_key("").is_err());
        assert!(check_key("/abs").is_err());
        assert!(check_key("staging/../secret").is_err());
    }
}
