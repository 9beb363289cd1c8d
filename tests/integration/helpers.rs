//! Shared test helpers: an in-memory metadata store, a tempdir blob
//! store, a static rights table, and a capturing event sink.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use docvault::{
    AppResult, DocumentId, DocumentInput, DocumentStore, DomainEvent, EventSink, FolderId,
    LocalBlobStore, RequestContext, StaticRightsResolver, StorageConfig, UserId,
};
use docvault_database::connection::DatabasePool;
use docvault_database::migration::run_migrations;

/// The folder used by most scenarios.
pub const FOLDER: i64 = 100;

/// An [`EventSink`] that records every published event.
#[derive(Debug, Default)]
pub struct CapturingSink {
    events: Mutex<Vec<DomainEvent>>,
}

impl CapturingSink {
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for CapturingSink {
    async fn publish(&self, event: DomainEvent) -> AppResult<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// A fully wired store plus handles to its collaborators.
pub struct TestStore {
    pub store: DocumentStore,
    pub resolver: Arc<StaticRightsResolver>,
    pub blobs: Arc<LocalBlobStore>,
    pub sink: Arc<CapturingSink>,
    pub pool: sqlx::SqlitePool,
    _blob_dir: tempfile::TempDir,
}

/// Build a store with full rights for everyone and no quota.
pub async fn test_store() -> TestStore {
    test_store_with(None, StaticRightsResolver::allowing_all()).await
}

/// Build a store with full rights and a per-owner quota.
pub async fn test_store_with_quota(quota_bytes: u64) -> TestStore {
    test_store_with(Some(quota_bytes), StaticRightsResolver::allowing_all()).await
}

/// Build a store with the given rights table.
pub async fn test_store_with(
    quota_bytes: Option<u64>,
    resolver: StaticRightsResolver,
) -> TestStore {
    let db = DatabasePool::in_memory().await.expect("open in-memory db");
    run_migrations(db.pool()).await.expect("run migrations");
    let pool = db.into_pool();

    let blob_dir = tempfile::tempdir().expect("create blob dir");
    let storage_config = StorageConfig {
        root_path: blob_dir.path().to_str().unwrap().to_string(),
        default_quota_bytes: quota_bytes,
    };
    let blobs = Arc::new(
        LocalBlobStore::new(&storage_config)
            .await
            .expect("mount blob store"),
    );

    let resolver = Arc::new(resolver);
    let sink = Arc::new(CapturingSink::default());

    let store = DocumentStore::new(
        pool.clone(),
        blobs.clone(),
        resolver.clone(),
        sink.clone(),
    );

    TestStore {
        store,
        resolver,
        blobs,
        sink,
        pool,
        _blob_dir: blob_dir,
    }
}

/// Request context for a raw user id.
pub fn ctx(user: i64) -> RequestContext {
    RequestContext::new(UserId::from_raw(user))
}

/// Fresh create-input for the shared folder.
pub fn new_document(file_name: Option<&str>) -> DocumentInput {
    DocumentInput {
        id: None,
        folder_id: FolderId::from_raw(FOLDER),
        title: file_name.map(|n| format!("Title of {n}")),
        file_name: file_name.map(String::from),
        description: None,
        url: None,
        mime_type: file_name.map(|_| "application/octet-stream".to_string()),
    }
}

/// Update-input for an existing document, starting from its stored state.
pub fn update_of(document: &docvault::DocumentMetadata) -> DocumentInput {
    DocumentInput {
        id: Some(document.id),
        folder_id: document.folder_id,
        title: document.title.clone(),
        file_name: document.file_name.clone(),
        description: document.description.clone(),
        url: document.url.clone(),
        mime_type: None,
    }
}

/// Sorted live version numbers of a document, straight from the pool.
pub async fn version_numbers(pool: &sqlx::SqlitePool, id: DocumentId) -> Vec<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT version_number FROM versions WHERE document_id = ? ORDER BY version_number",
    )
    .bind(id.into_raw())
    .fetch_all(pool)
    .await
    .unwrap()
}
