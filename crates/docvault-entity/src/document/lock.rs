//! Advisory document write lock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use docvault_core::types::{DocumentId, UserId};

/// Lock scope. Only exclusive locks exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LockScope {
    /// The lock excludes all other writers.
    Exclusive,
}

/// Lock type. Only write locks exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LockType {
    /// The lock guards mutations, not reads.
    Write,
}

/// An advisory, timed, per-document write lock.
///
/// Locking is cooperative concurrency control layered on top of the
/// sequence-number check, not a replacement for it. A document has zero
/// or one active write lock; the holder bypasses its own lock.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lock {
    /// The locked document.
    pub document_id: DocumentId,
    /// The user holding the lock.
    pub owner: UserId,
    /// Lock scope.
    pub scope: LockScope,
    /// Lock type.
    pub lock_type: LockType,
    /// When the lock was acquired.
    pub acquired_at: DateTime<Utc>,
    /// Wall-clock deadline after which the lock no longer holds.
    /// `None` means the lock never expires automatically.
    pub timeout_at: Option<DateTime<Utc>>,
}

impl Lock {
    /// Whether the lock has passed its deadline at the given instant.
    /// Infinite locks never expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.timeout_at.is_some_and(|deadline| deadline <= now)
    }

    /// Whether the given user holds this lock.
    pub fn is_held_by(&self, user: UserId) -> bool {
        self.owner == user
    }
}
