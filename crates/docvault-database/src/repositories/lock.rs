//! Lock repository — the persisted advisory write locks.
//!
//! Expiry is lazy: expired rows are purged when next read. No background
//! sweeper is required.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use docvault_core::error::{AppError, ErrorKind};
use docvault_core::result::AppResult;
use docvault_core::types::{DocumentId, UserId};
use docvault_entity::document::lock::Lock;

/// Repository for document write locks.
#[derive(Debug, Clone)]
pub struct LockRepository {
    pool: SqlitePool,
}

impl LockRepository {
    /// Create a new lock repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find the active lock on a document, purging it first if it has
    /// expired.
    pub async fn find_active(&self, document_id: DocumentId) -> AppResult<Option<Lock>> {
        let lock = sqlx::query_as::<_, Lock>("SELECT * FROM locks WHERE document_id = ?")
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find lock", e))?;

        match lock {
            Some(lock) if lock.is_expired(Utc::now()) => {
                debug!(document_id = %document_id, owner = %lock.owner, "Purging expired lock");
                self.delete(document_id, lock.owner).await?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    /// Insert or refresh a lock. The single-row-per-document constraint
    /// is the primary key; a refresh overwrites deadline and owner.
    pub async fn upsert(&self, lock: &Lock) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO locks (document_id, owner, scope, lock_type, acquired_at, timeout_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(document_id) DO UPDATE SET \
                 owner = excluded.owner, \
                 acquired_at = excluded.acquired_at, \
                 timeout_at = excluded.timeout_at",
        )
        .bind(lock.document_id)
        .bind(lock.owner)
        .bind(lock.scope)
        .bind(lock.lock_type)
        .bind(lock.acquired_at)
        .bind(lock.timeout_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to store lock", e))?;
        Ok(())
    }

    /// Delete a lock held by the given owner. Returns whether a row was
    /// removed.
    pub async fn delete(&self, document_id: DocumentId, owner: UserId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM locks WHERE document_id = ? AND owner = ?")
            .bind(document_id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete lock", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete any lock on a document regardless of owner (used when the
    /// document itself is deleted).
    pub async fn delete_all(&self, document_id: DocumentId) -> AppResult<()> {
        sqlx::query("DELETE FROM locks WHERE document_id = ?")
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to clear locks", e))?;
        Ok(())
    }
}
