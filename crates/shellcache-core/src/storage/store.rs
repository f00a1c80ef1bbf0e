use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::Response;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed bucket document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// A response as it lives inside a bucket: status, content type and body,
/// stamped with when it was stored so its age can be reported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredResponse {
    pub status: u16,
    pub content_type: Option<String>,
    #[serde(with = "body_encoding")]
    pub body: Vec<u8>,
    pub stored_at: DateTime<Utc>,
}

impl StoredResponse {
    pub fn from_response(response: &Response) -> Self {
        Self {
            status: response.status,
            content_type: response.content_type.clone(),
            body: response.body.clone(),
            stored_at: Utc::now(),
        }
    }

    /// Rebuild a page-facing response from the stored entry.
    pub fn into_response(self, url: &str) -> Response {
        Response {
            url: url.to_string(),
            status: self.status,
            content_type: self.content_type,
            body: self.body,
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.stored_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Covers clock skew too
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

/// Bodies are binary; base64 keeps the bucket documents compact and valid
/// JSON strings.
mod body_encoding {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(&encoded).map_err(serde::de::Error::custom)
    }
}

/// Abstraction over the platform's cache storage facility.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open the named bucket, creating it if it does not exist.
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheBucket>, StorageError>;

    /// Names of every bucket currently present.
    async fn keys(&self) -> Result<Vec<String>, StorageError>;

    /// Delete a bucket entirely. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool, StorageError>;
}

/// One named bucket of URL -> response pairs.
#[async_trait]
pub trait CacheBucket: Send + Sync {
    async fn put(&self, url: &str, response: StoredResponse) -> Result<(), StorageError>;

    async fn match_url(&self, url: &str) -> Result<Option<StoredResponse>, StorageError>;

    async fn urls(&self) -> Result<Vec<String>, StorageError>;
}
