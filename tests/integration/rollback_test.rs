//! Orphaned-blob handling: a metadata transaction that fails after the
//! blob write must leave no committed reference to the blob and reap it
//! through the deferred-deletion path.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use docvault::{
    AppResult, BlobKey, BlobStore, ByteStream, DocumentStore, ErrorKind, LocalBlobStore,
    StaticRightsResolver, StorageConfig, UserId,
};
use docvault_database::connection::DatabasePool;
use docvault_database::migration::run_migrations;

use crate::helpers::{ctx, new_document, update_of, CapturingSink};

/// A blob store wrapper that bumps every document's sequence number
/// right before each write lands, simulating a concurrent writer
/// slipping in between the blob write and the metadata transaction.
#[derive(Debug)]
struct RacingBlobStore {
    inner: Arc<LocalBlobStore>,
    pool: sqlx::SqlitePool,
    keys: Mutex<Vec<BlobKey>>,
}

impl RacingBlobStore {
    fn written_keys(&self) -> Vec<BlobKey> {
        self.keys.lock().unwrap().clone()
    }

    async fn sabotage(&self) {
        sqlx::query("UPDATE documents SET sequence_number = sequence_number + 1000")
            .execute(&self.pool)
            .await
            .unwrap();
    }
}

#[async_trait]
impl BlobStore for RacingBlobStore {
    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }

    async fn put(
        &self,
        owner: UserId,
        stream: ByteStream,
        size_hint: Option<u64>,
    ) -> AppResult<BlobKey> {
        self.sabotage().await;
        let key = self.inner.put(owner, stream, size_hint).await?;
        self.keys.lock().unwrap().push(key.clone());
        Ok(key)
    }

    async fn put_bytes(&self, owner: UserId, data: Bytes) -> AppResult<BlobKey> {
        self.sabotage().await;
        let key = self.inner.put_bytes(owner, data).await?;
        self.keys.lock().unwrap().push(key.clone());
        Ok(key)
    }

    async fn get(&self, key: &BlobKey) -> AppResult<ByteStream> {
        self.inner.get(key).await
    }

    async fn get_bytes(&self, key: &BlobKey) -> AppResult<Bytes> {
        self.inner.get_bytes(key).await
    }

    async fn delete(&self, key: &BlobKey) -> AppResult<()> {
        self.inner.delete(key).await
    }

    async fn size_of(&self, key: &BlobKey) -> AppResult<u64> {
        self.inner.size_of(key).await
    }
}

#[tokio::test]
async fn failed_metadata_transaction_reaps_the_orphaned_blob() {
    let db = DatabasePool::in_memory().await.unwrap();
    run_migrations(db.pool()).await.unwrap();
    let pool = db.into_pool();

    let blob_dir = tempfile::tempdir().unwrap();
    let storage_config = StorageConfig {
        root_path: blob_dir.path().to_str().unwrap().to_string(),
        default_quota_bytes: None,
    };
    let local = Arc::new(LocalBlobStore::new(&storage_config).await.unwrap());
    let racing = Arc::new(RacingBlobStore {
        inner: local.clone(),
        pool: pool.clone(),
        keys: Mutex::new(Vec::new()),
    });

    let store = DocumentStore::new(
        pool.clone(),
        racing.clone(),
        Arc::new(StaticRightsResolver::allowing_all()),
        Arc::new(CapturingSink::default()),
    );

    let alice = ctx(1);
    let doc = store
        .documents
        .save(&alice, new_document(Some("contended.txt")), None, None)
        .await
        .unwrap();

    // The blob write succeeds, but by the time the metadata transaction
    // runs, the baseline has moved: the conditioned update affects zero
    // rows and the whole transaction rolls back.
    let err = store
        .documents
        .save(
            &alice,
            update_of(&doc),
            Some(Bytes::from("contended content")),
            Some(doc.sequence_number),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    // No committed version row references the blob...
    let numbers = crate::helpers::version_numbers(&pool, doc.id).await;
    assert_eq!(numbers, vec![0]);

    // ...and the deferred-deletion path removed it from the store.
    let keys = racing.written_keys();
    assert_eq!(keys.len(), 1);
    let err = local.get_bytes(&keys[0]).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}
