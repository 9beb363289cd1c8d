//! DocVault — a versioned document store.
//!
//! Relational metadata (documents plus version history) kept consistent
//! with a quota-accounted blob store under concurrent writers, with
//! advisory write locks and optimistic concurrency. This crate wires the
//! workspace together and re-exports the public surface.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

pub use docvault_core::config::{AppConfig, DatabaseConfig, LoggingConfig, StorageConfig};
pub use docvault_core::error::{AppError, ErrorKind};
pub use docvault_core::events::{DocumentEvent, DomainEvent};
pub use docvault_core::result::AppResult;
pub use docvault_core::traits::blob::{BlobKey, BlobStore, ByteStream};
pub use docvault_core::traits::events::EventSink;
pub use docvault_core::types::sorting::{SortDirection, SortOrder};
pub use docvault_core::types::{DocumentId, FolderId, UserId};
pub use docvault_database::connection::DatabasePool;
pub use docvault_database::migration::run_migrations;
pub use docvault_entity::document::delta::DocumentDelta;
pub use docvault_entity::document::field::{DocumentField, VersionField};
pub use docvault_entity::document::lock::Lock;
pub use docvault_entity::document::model::{DocumentInput, DocumentMetadata};
pub use docvault_entity::document::version::Version;
pub use docvault_entity::rights::{AccessScope, RightsSet};
pub use docvault_service::{
    DocumentService, DocumentStore, LockManager, RemovalService, RequestContext, RightsResolver,
    StaticRightsResolver, INFINITE_TIMEOUT,
};
pub use docvault_storage::LocalBlobStore;

/// Open the store described by `config`: connect the metadata database,
/// run migrations, and mount the local blob store.
pub async fn open(
    config: &AppConfig,
    resolver: Arc<dyn RightsResolver>,
    sink: Arc<dyn EventSink>,
) -> AppResult<DocumentStore> {
    let db = DatabasePool::connect(&config.database).await?;
    run_migrations(db.pool()).await?;
    let blobs = Arc::new(LocalBlobStore::new(&config.storage).await?);
    Ok(DocumentStore::new(db.into_pool(), blobs, resolver, sink))
}

/// Initialise tracing from the logging configuration. `RUST_LOG`
/// overrides the configured level.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    if config.format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init()
            .ok();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .ok();
    }
}
