//! In-memory object store.
//!
//! Used by tests and by local runs without R2 credentials. URLs are built
//! from a configurable base so platform mocks can be pointed at them.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::client::public_url;
use crate::error::{StorageError, StorageResult};
use crate::store::{check_key, ObjectInfo, ObjectStore};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    created_at: DateTime<Utc>,
}

/// Object store backed by a map.
#[derive(Debug)]
pub struct InMemoryStore {
    base_url: String,
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl InMemoryStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Insert an object with an explicit creation time.
    pub async fn insert_at(
        &self,
        key: &str,
        data: impl Into<Bytes>,
        content_type: &str,
        created_at: DateTime<Utc>,
    ) {
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data: data.into(),
                content_type: content_type.to_string(),
                created_at,
            },
        );
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    pub async fn content_type(&self, key: &str) -> Option<String> {
        self.objects.read().await.get(key).map(|o| o.content_type.clone())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new("http://localhost/objects")
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<String> {
        check_key(key)?;
        self.insert_at(key, data, content_type, Utc::now()).await;
        Ok(public_url(&self.base_url, key))
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| StorageError::not_found(key))
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        Ok(self
            .objects
            .read()
            .await
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, obj)| ObjectInfo {
                key: key.clone(),
                size: obj.data.len() as u64,
                created_at: Some(obj.created_at),
            })
            .collect())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn url_for(&self, key: &str) -> StorageResult<String> {
        if !self.contains(key).await {
            return Err(StorageError::not_found(key));
        }
        Ok(public_url(&self.base_url, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = InMemoryStore::new("https://cdn.example.com");

        let url = store
            .put("staging/a.mp4", Bytes::from_static(b"abc"), "video/mp4")
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.example.com/staging/a.mp4");
        assert_eq!(store.get("staging/a.mp4").await.unwrap().as_ref(), b"abc");
        assert_eq!(store.content_type("staging/a.mp4").await.as_deref(), Some("video/mp4"));

        store.delete("staging/a.mp4").await.unwrap();
        assert!(!store.contains("staging/a.mp4").await);
        assert!(store.get("staging/a.mp4").await.unwrap_err().is_not_found());

        // Deleting again is fine
        store.delete("staging/a.mp4").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_by_prefix() {
        let store = InMemoryStore::default();
        store.put("queue/1.mp4", Bytes::from_static(b"1"), "video/mp4").await.unwrap();
        store.put("queue/2.mp4", Bytes::from_static(b"22"), "video/mp4").await.unwrap();
        store.put("failed/3.mp4", Bytes::from_static(b"3"), "video/mp4").await.unwrap();

        let listed = store.list("queue/").await.unwrap();
        let keys: Vec<_> = listed.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["queue/1.mp4", "queue/2.mp4"]);
        assert_eq!(listed[1].size, 2);
    }

    #[tokio::test]
    async fn test_rejects_bad_keys() {
        let store = InMemoryStore::default();
        let err = store.put("../escape", Bytes::new(), "video/mp4").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }
}
