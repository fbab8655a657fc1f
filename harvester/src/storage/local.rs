//! Local filesystem storage backend
//!
//! One file per key under a base directory. Writes go through a temp file
//! and a rename so a crashed run never leaves a partially-written artifact.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{StorageBackend, StorageError, StorageResult, content_sha256};

/// Filesystem-backed storage
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base: PathBuf,
}

impl LocalStorage {
    /// Create the backend, creating the base directory if needed.
    pub fn new(base: impl AsRef<Path>) -> StorageResult<Self> {
        let base = base.as_ref().to_path_buf();
        std::fs::create_dir_all(&base)?;
        Ok(Self { base })
    }

    fn full_path(&self, key: &str) -> PathBuf {
        self.base.join(key)
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn save(&self, key: &str, bytes: &[u8]) -> StorageResult<()> {
        let path = self.full_path(key);
        let tmp = self.base.join(format!(".{key}.tmp"));
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &path)?;
        tracing::info!(key, location = %self.location(), "saved artifact");
        Ok(())
    }

    async fn load(&self, key: &str) -> StorageResult<Vec<u8>> {
        match std::fs::read(self.full_path(key)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn content_digest(&self, key: &str) -> StorageResult<Option<String>> {
        match std::fs::read(self.full_path(key)) {
            Ok(bytes) => Ok(Some(content_sha256(&bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        for entry in std::fs::read_dir(&self.base)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                // Skip in-flight temp files
                if name.starts_with('.') {
                    continue;
                }
                keys.push(name.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn location(&self) -> String {
        self.base.display().to_string()
    }
}
