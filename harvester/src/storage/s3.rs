//! S3 object store storage backend
//!
//! The content digest is recorded as object metadata at write time and read
//! back from `head_object`, so the digest exposed to the sync engine is a
//! true hash of the bytes written, never a multipart-upload entity tag.
//! Objects written by other tools report no digest and sync treats them as
//! new.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;

use super::{StorageBackend, StorageError, StorageResult, content_sha256};

/// Metadata key carrying the hex SHA-256 of the object bytes
const DIGEST_METADATA_KEY: &str = "content-sha256";

/// S3-backed storage
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    /// Create the backend with the default AWS credential chain.
    pub async fn new(bucket: impl Into<String>) -> Self {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self {
            client: Client::new(&aws_config),
            bucket: bucket.into(),
        }
    }

    /// Create the backend from an existing client (tests, custom endpoints).
    pub fn with_client(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl StorageBackend for S3Storage {
    async fn save(&self, key: &str, bytes: &[u8]) -> StorageResult<()> {
        let digest = content_sha256(bytes);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes.to_vec()))
            .content_type("application/json")
            .metadata(DIGEST_METADATA_KEY, digest)
            .send()
            .await
            .map_err(|e| StorageError::Store(format!("{}", DisplayErrorContext(&e))))?;

        tracing::info!(key, location = %self.location(), "saved artifact");
        Ok(())
    }

    async fn load(&self, key: &str) -> StorageResult<Vec<u8>> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|s| s.is_no_such_key()) {
                    StorageError::NotFound(key.to_string())
                } else {
                    StorageError::Store(format!("{}", DisplayErrorContext(&e)))
                }
            })?;

        let bytes = object
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Store(format!("reading body of {key}: {e}")))?;
        Ok(bytes.into_bytes().to_vec())
    }

    async fn content_digest(&self, key: &str) -> StorageResult<Option<String>> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(head) => Ok(head
                .metadata()
                .and_then(|m| m.get(DIGEST_METADATA_KEY))
                .cloned()),
            Err(e) if e.as_service_error().is_some_and(|s| s.is_not_found()) => Ok(None),
            Err(e) => Err(StorageError::Store(format!("{}", DisplayErrorContext(&e)))),
        }
    }

    async fn keys(&self) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page =
                page.map_err(|e| StorageError::Store(format!("{}", DisplayErrorContext(&e))))?;
            for object in page.contents() {
                if let Some(key) = object.key() {
                    keys.push(key.to_string());
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn location(&self) -> String {
        format!("s3://{}", self.bucket)
    }
}
