//! Content-addressed storage synchronization
//!
//! Copies only changed or missing objects from a source backend to a
//! destination backend, comparing content digests. Re-running after a no-op
//! run performs zero writes.

use serde::Serialize;

use super::{StorageBackend, StorageResult};

/// Outcome tally of one sync run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl std::fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "added: {}, updated: {}, unchanged: {}",
            self.added, self.updated, self.unchanged
        )
    }
}

/// Ensure `destination` holds an up-to-date copy of every key in `source`.
///
/// Keys present only on the destination are left alone; sync is one-way.
pub async fn sync_backends(
    source: &dyn StorageBackend,
    destination: &dyn StorageBackend,
) -> StorageResult<SyncSummary> {
    let source_digests = source.digests().await?;
    let mut summary = SyncSummary::default();

    for (key, source_digest) in &source_digests {
        match destination.content_digest(key).await? {
            None => {
                tracing::info!(key = %key, "copying new object");
                copy_object(source, destination, key).await?;
                summary.added += 1;
            }
            Some(dest_digest) if &dest_digest != source_digest => {
                tracing::info!(key = %key, "overwriting changed object");
                copy_object(source, destination, key).await?;
                summary.updated += 1;
            }
            Some(_) => {
                tracing::debug!(key = %key, "digests match, skipping");
                summary.unchanged += 1;
            }
        }
    }

    tracing::info!(
        source = %source.location(),
        destination = %destination.location(),
        added = summary.added,
        updated = summary.updated,
        unchanged = summary.unchanged,
        "sync complete"
    );
    Ok(summary)
}

async fn copy_object(
    source: &dyn StorageBackend,
    destination: &dyn StorageBackend,
    key: &str,
) -> StorageResult<()> {
    let bytes = source.load(key).await?;
    destination.save(key, &bytes).await
}
