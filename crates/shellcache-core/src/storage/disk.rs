use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::store::{CacheBucket, CacheStorage, StorageError, StoredResponse};

/// Persistent storage: one pretty-printed JSON document per bucket under
/// the cache directory. Generation tags are deploy-time constants and
/// filename-safe, so they are used verbatim as file stems.
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub fn new(root: PathBuf) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn bucket_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.json", name))
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheBucket>, StorageError> {
        let path = self.bucket_path(name);
        let entries = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            HashMap::new()
        };
        debug!(bucket = name, entries = entries.len(), "opened disk bucket");
        Ok(Arc::new(DiskBucket {
            path,
            entries: RwLock::new(entries),
        }))
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        let path = self.bucket_path(name);
        if path.exists() {
            std::fs::remove_file(path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

/// Open handle onto one bucket document. Writes go straight back to disk;
/// install is the only bulk writer per generation, so last-write-wins on
/// the whole document is safe.
struct DiskBucket {
    path: PathBuf,
    entries: RwLock<HashMap<String, StoredResponse>>,
}

impl DiskBucket {
    fn persist(&self, entries: &HashMap<String, StoredResponse>) -> Result<(), StorageError> {
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

#[async_trait]
impl CacheBucket for DiskBucket {
    async fn put(&self, url: &str, response: StoredResponse) -> Result<(), StorageError> {
        let mut entries = self.entries.write().await;
        entries.insert(url.to_string(), response);
        self.persist(&entries)
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
