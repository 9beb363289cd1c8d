//! Lock manager — exclusive, timed, per-document write locks.
//!
//! Locking is advisory, cooperative concurrency control layered on top
//! of (not a replacement for) the sequence-number check. Deadlines are
//! wall-clock and checked lazily on next access; no background sweeper
//! is required.

use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use tracing::info;

use docvault_core::error::AppError;
use docvault_core::result::AppResult;
use docvault_core::types::{DocumentId, UserId};
use docvault_database::repositories::document::DocumentRepository;
use docvault_database::repositories::lock::LockRepository;
use docvault_entity::document::lock::{Lock, LockScope, LockType};
use docvault_entity::document::model::DocumentMetadata;

use crate::context::RequestContext;
use crate::permission::gate::PermissionGate;

/// Timeout value that never expires automatically.
pub const INFINITE_TIMEOUT: i64 = -1;

/// Manages exclusive write locks on documents.
#[derive(Debug, Clone)]
pub struct LockManager {
    documents: DocumentRepository,
    locks: LockRepository,
    gate: PermissionGate,
}

impl LockManager {
    /// Create a lock manager over the given pool and gate.
    pub fn new(pool: SqlitePool, gate: PermissionGate) -> Self {
        Self {
            documents: DocumentRepository::new(pool.clone()),
            locks: LockRepository::new(pool),
            gate,
        }
    }

    /// Acquire or refresh the write lock on a document.
    ///
    /// `timeout_millis` is a duration from now; [`INFINITE_TIMEOUT`] (or
    /// any negative value) never expires. Fails with `Locked` when
    /// another user holds an active lock.
    pub async fn lock(
        &self,
        ctx: &RequestContext,
        document_id: DocumentId,
        timeout_millis: i64,
    ) -> AppResult<Lock> {
        let document = self.load(document_id).await?;
        self.gate.require_write(ctx, &document).await?;

        if let Some(existing) = self.locks.find_active(document_id).await? {
            if !existing.is_held_by(ctx.user_id) {
                return Err(AppError::locked(format!(
                    "Document {document_id} is locked by user {}",
                    existing.owner
                )));
            }
        }

        let now = Utc::now();
        let timeout_at = if timeout_millis < 0 {
            None
        } else {
            Some(now + Duration::milliseconds(timeout_millis))
        };

        let lock = Lock {
            document_id,
            owner: ctx.user_id,
            scope: LockScope::Exclusive,
            lock_type: LockType::Write,
            acquired_at: now,
            timeout_at,
        };
        self.locks.upsert(&lock).await?;

        info!(
            document_id = %document_id,
            owner = %ctx.user_id,
            infinite = timeout_at.is_none(),
            "Document locked"
        );
        Ok(lock)
    }

    /// Release the lock on a document.
    ///
    /// Requires write permission; additionally the caller must be the
    /// document's creator, its last modifier, or the lock holder.
    pub async fn unlock(&self, ctx: &RequestContext, document_id: DocumentId) -> AppResult<()> {
        let document = self.load(document_id).await?;
        self.gate.require_write(ctx, &document).await?;

        let active = self.locks.find_active(document_id).await?;
        let allowed = document.created_by == ctx.user_id
            || document.modified_by == ctx.user_id
            || active.as_ref().is_some_and(|lock| lock.is_held_by(ctx.user_id));
        if !allowed {
            return Err(AppError::permission_denied(format!(
                "User {} may not unlock document {document_id}",
                ctx.user_id
            )));
        }

        self.locks.delete_all(document_id).await?;
        info!(document_id = %document_id, user = %ctx.user_id, "Document unlocked");
        Ok(())
    }

    /// Whether the document currently carries an active lock.
    pub async fn is_locked(&self, document_id: DocumentId) -> AppResult<bool> {
        Ok(self.locks.find_active(document_id).await?.is_some())
    }

    /// The active locks on a document (zero or one).
    pub async fn find_locks(&self, document_id: DocumentId) -> AppResult<Vec<Lock>> {
        Ok(self.locks.find_active(document_id).await?.into_iter().collect())
    }

    /// The lock that blocks `user` from writing `document`, if any.
    ///
    /// The lock holder bypasses its own lock, and so does the document's
    /// last modifier (self-lock).
    pub async fn blocking_lock(
        &self,
        document: &DocumentMetadata,
        user: UserId,
    ) -> AppResult<Option<Lock>> {
        match self.locks.find_active(document.id).await? {
            Some(lock) if !lock.is_held_by(user) && document.modified_by != user => Ok(Some(lock)),
            _ => Ok(None),
        }
    }

    async fn load(&self, document_id: DocumentId) -> AppResult<DocumentMetadata> {
        self.documents
            .find_by_id(document_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Document {document_id} not found")))
    }
}
