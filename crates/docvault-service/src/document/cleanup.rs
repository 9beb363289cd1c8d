//! Deferred blob deletion.
//!
//! Blob stores are not covered by the metadata transaction, so a blob is
//! never physically deleted until the owning transaction is known to
//! have committed. Each operation carries its own explicit pending list
//! (no thread-local state); the facade flushes it only after commit and
//! drops it entirely on rollback.

use tracing::warn;

use docvault_core::traits::blob::{BlobKey, BlobStore};

/// Per-operation list of blobs awaiting deletion.
#[derive(Debug, Default)]
pub struct DeferredBlobDeletions {
    keys: Vec<BlobKey>,
}

impl DeferredBlobDeletions {
    /// Create an empty pending list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one blob for post-commit deletion.
    pub fn defer(&mut self, key: BlobKey) {
        self.keys.push(key);
    }

    /// Queue several blobs for post-commit deletion.
    pub fn defer_all(&mut self, keys: impl IntoIterator<Item = BlobKey>) {
        self.keys.extend(keys);
    }

    /// Number of queued deletions.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Drop the list without deleting anything (transaction rolled back;
    /// the blobs are still referenced or were never committed).
    pub fn discard(self) {}

    /// Delete the queued blobs, best effort. Failures are logged and the
    /// key is abandoned as an orphan — never re-queued into a failed
    /// transaction.
    pub async fn flush(self, store: &dyn BlobStore) {
        for key in self.keys {
            if let Err(err) = store.delete(&key).await {
                warn!(key = %key, error = %err, "Deferred blob deletion failed; orphan left behind");
            }
        }
    }
}
