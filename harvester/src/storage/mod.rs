//! Pluggable artifact storage
//!
//! One capability trait over two backends (local filesystem, S3 object
//! store). Artifacts are write-once JSON objects keyed by
//! `"{orderNumber}.json"`; callers depend only on the trait.

pub mod local;
pub mod s3;
pub mod sync;

pub use local::LocalStorage;
pub use s3::S3Storage;
pub use sync::{SyncSummary, sync_backends};

use std::collections::BTreeMap;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::StorageTarget;
use shared::RawOrder;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Object store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Hex SHA-256 of stored bytes, the content digest both backends expose.
pub fn content_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Storage backend capability
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write an object atomically under `key`, overwriting any prior copy.
    async fn save(&self, key: &str, bytes: &[u8]) -> StorageResult<()>;

    /// Read an object's bytes.
    async fn load(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Content digest of the object under `key`; `None` when absent (or the
    /// backend holds no digest for it).
    async fn content_digest(&self, key: &str) -> StorageResult<Option<String>>;

    /// All keys currently present, sorted.
    async fn keys(&self) -> StorageResult<Vec<String>>;

    /// Human-readable location for logs.
    fn location(&self) -> String;

    /// Full key-to-digest map. Keys without a recoverable digest are skipped.
    async fn digests(&self) -> StorageResult<BTreeMap<String, String>> {
        let mut map = BTreeMap::new();
        for key in self.keys().await? {
            match self.content_digest(&key).await? {
                Some(digest) => {
                    map.insert(key, digest);
                }
                None => {
                    tracing::warn!(key = %key, "no content digest recoverable, skipping");
                }
            }
        }
        Ok(map)
    }

    /// Idempotent write: skip when the backend already holds identical
    /// bytes under `key`. Returns whether a write happened.
    async fn save_if_changed(&self, key: &str, bytes: &[u8]) -> StorageResult<bool> {
        let digest = content_sha256(bytes);
        if self.content_digest(key).await?.as_deref() == Some(digest.as_str()) {
            tracing::debug!(key, "content unchanged, skipping write");
            return Ok(false);
        }
        self.save(key, bytes).await?;
        Ok(true)
    }
}

/// Construct the backend for a resolved storage target.
pub async fn backend_for(target: &StorageTarget) -> StorageResult<Box<dyn StorageBackend>> {
    match target {
        StorageTarget::Local { path } => Ok(Box::new(LocalStorage::new(path)?)),
        StorageTarget::S3 { bucket } => Ok(Box::new(S3Storage::new(bucket.as_str()).await)),
    }
}

/// Load every captured order document from a backend, sorted by key.
///
/// Unparseable documents are skipped with a warning; one bad artifact never
/// aborts the collection.
pub async fn load_raw_orders(backend: &dyn StorageBackend) -> StorageResult<Vec<RawOrder>> {
    let mut orders = Vec::new();
    for key in backend.keys().await? {
        if !key.ends_with(".json") {
            continue;
        }
        let bytes = backend.load(&key).await?;
        match serde_json::from_slice::<RawOrder>(&bytes) {
            Ok(mut order) => {
                order.source_file = Some(key);
                orders.push(order);
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "skipping unparseable order document");
            }
        }
    }
    Ok(orders)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory backend for tests
    #[derive(Default)]
    pub struct MemoryStorage {
        objects: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl MemoryStorage {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, key: &str, bytes: &[u8]) {
            self.objects
                .lock()
                .unwrap()
                .insert(key.to_string(), bytes.to_vec());
        }

        pub fn get(&self, key: &str) -> Option<Vec<u8>> {
            self.objects.lock().unwrap().get(key).cloned()
        }

        pub fn len(&self) -> usize {
            self.objects.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl StorageBackend for MemoryStorage {
        async fn save(&self, key: &str, bytes: &[u8]) -> StorageResult<()> {
            self.insert(key, bytes);
            Ok(())
        }

        async fn load(&self, key: &str) -> StorageResult<Vec<u8>> {
            self.get(key)
                .ok_or_else(|| StorageError::NotFound(key.to_string()))
        }

        async fn content_digest(&self, key: &str) -> StorageResult<Option<String>> {
            Ok(self.get(key).map(|bytes| content_sha256(&bytes)))
        }

        async fn keys(&self) -> StorageResult<Vec<String>> {
            let mut keys: Vec<String> =
                self.objects.lock().unwrap().keys().cloned().collect();
            keys.sort();
            Ok(keys)
        }

        fn location(&self) -> String {
            "memory".into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MemoryStorage;
    use super::*;

    #[test]
    fn test_content_sha256_known_vector() {
        // sha256("")
        assert_eq!(
            content_sha256(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn test_save_if_changed_skips_identical_content() {
        let storage = MemoryStorage::new();
        assert!(storage.save_if_changed("a.json", b"{}").await.unwrap());
        assert!(!storage.save_if_changed("a.json", b"{}").await.unwrap());
        assert!(storage.save_if_changed("a.json", b"{\"x\":1}").await.unwrap());
    }

    #[tokio::test]
    async fn test_load_raw_orders_skips_malformed() {
        let storage = MemoryStorage::new();
        storage.insert("b.json", br#"{"orderNumber": "B"}"#);
        storage.insert("a.json", br#"{"orderNumber": "A"}"#);
        storage.insert("broken.json", b"not json");
        storage.insert("notes.txt", b"ignored");

        let orders = load_raw_orders(&storage).await.unwrap();
        assert_eq!(orders.len(), 2);
        // Sorted by key, with traceability back to the artifact
        assert_eq!(orders[0].order_number, "A");
        assert_eq!(orders[0].source_file.as_deref(), Some("a.json"));
        assert_eq!(orders[1].order_number, "B");
    }
}
