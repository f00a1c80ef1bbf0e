use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{CacheBucket, CacheStorage, StorageError, StoredResponse};

/// Ephemeral in-memory storage. Buckets live as long as the storage does.
#[derive(Default, Clone)]
pub struct MemoryStorage {
    buckets: Arc<RwLock<HashMap<String, Arc<MemoryBucket>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheBucket>, StorageError> {
        let mut buckets = self.buckets.write().await;
        let bucket = buckets
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryBucket::default()));
        Ok(Arc::clone(bucket) as Arc<dyn CacheBucket>)
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let buckets = self.buckets.read().await;
        let mut names: Vec<String> = buckets.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        let mut buckets = self.buckets.write().await;
        Ok(buckets.remove(name).is_some())
    }
}

#[derive(Default)]
struct MemoryBucket {
    entries: RwLock<HashMap<String, StoredResponse>>,
}

#[async_trait]
impl CacheBucket for MemoryBucket {
    async fn put(&self, url: &str, response: StoredResponse) -> Result<(), StorageError> {
        let mut entries = self.entries.write().await;
        entries.insert(url.to_string(), response);
        Ok(())
    }

    async fn match_url(&self, url: &str) -> Result<Option<StoredResponse>, StorageError> {
        let entries = self.entries.read().await;
        Ok(entries.get(url).cloned())
    }

    async fn urls(&self) -> Result<Vec<String>, StorageError> {
        let entries = self.entries.read().await;
        let mut urls: Vec<String> = entries.keys().cloned().collect();
        urls.sort();
        Ok(urls)
    }
}
