//! One-stop wiring of the document store services.

use std::sync::Arc;

use sqlx::SqlitePool;

use docvault_core::traits::blob::BlobStore;
use docvault_core::traits::events::EventSink;

use crate::document::removal::RemovalService;
use crate::document::service::DocumentService;
use crate::lock::manager::LockManager;
use crate::permission::resolver::RightsResolver;

/// The assembled document store: facade, removal, and lock services
/// sharing one pool, blob store, permission resolver, and event sink.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    /// Read/save facade.
    pub documents: DocumentService,
    /// Batch and version removal.
    pub removal: RemovalService,
    /// Advisory write locks.
    pub locks: LockManager,
}

impl DocumentStore {
    /// Wire the services over a migrated pool.
    pub fn new(
        pool: SqlitePool,
        blobs: Arc<dyn BlobStore>,
        resolver: Arc<dyn RightsResolver>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let documents = DocumentService::new(pool, blobs, resolver, sink);
        let locks = documents.locks().clone();
        let removal = RemovalService::new(documents.clone());
        Self {
            documents,
            removal,
            locks,
        }
    }
}
