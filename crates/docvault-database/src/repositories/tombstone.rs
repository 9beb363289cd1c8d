//! Tombstone repository — queries over the deleted-row records.
//!
//! Tombstones are written by the delete actions inside the same
//! transaction as the deletion itself; this repository only reads them.

use sqlx::SqlitePool;

use docvault_core::error::{AppError, ErrorKind};
use docvault_core::result::AppResult;
use docvault_core::types::{DocumentId, FolderId, UserId};
use docvault_entity::document::tombstone::{DocumentTombstone, VersionTombstone};

/// Repository for tombstone queries.
#[derive(Debug, Clone)]
pub struct TombstoneRepository {
    pool: SqlitePool,
}

impl TombstoneRepository {
    /// Create a new tombstone repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Documents in the folder deleted after the given sequence baseline,
    /// oldest deletion first.
    pub async fn find_documents_deleted_since(
        &self,
        folder_id: FolderId,
        since: i64,
        owner_scope: Option<UserId>,
    ) -> AppResult<Vec<DocumentTombstone>> {
        let result = match owner_scope {
            Some(owner) => {
                sqlx::query_as::<_, DocumentTombstone>(
                    "SELECT * FROM document_tombstones \
                     WHERE folder_id = ? AND sequence_number > ? AND created_by = ? \
                     ORDER BY sequence_number ASC",
                )
                .bind(folder_id)
                .bind(since)
                .bind(owner)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, DocumentTombstone>(
                    "SELECT * FROM document_tombstones \
                     WHERE folder_id = ? AND sequence_number > ? \
                     ORDER BY sequence_number ASC",
                )
                .bind(folder_id)
                .bind(since)
                .fetch_all(&self.pool)
                .await
            }
        };

        result.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to scan deleted documents", e)
        })
    }

    /// Deleted versions of a document, oldest deletion first.
    pub async fn find_versions_deleted(
        &self,
        document_id: DocumentId,
    ) -> AppResult<Vec<VersionTombstone>> {
        sqlx::query_as::<_, VersionTombstone>(
            "SELECT * FROM version_tombstones WHERE document_id = ? ORDER BY version_number ASC",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to scan deleted versions", e)
        })
    }
}
