//! Tombstone rows recording deleted documents and versions.
//!
//! Tombstones feed delta queries and audit; they do not count towards
//! folder occupancy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use docvault_core::types::{DocumentId, FolderId, UserId};

/// Record of a deleted document.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentTombstone {
    /// The deleted document's identifier.
    pub document_id: DocumentId,
    /// The folder it lived in.
    pub folder_id: FolderId,
    /// The file name it carried at deletion time.
    pub file_name: Option<String>,
    /// The original creator (used for owner-scoped delta queries).
    pub created_by: UserId,
    /// The user who deleted it.
    pub deleted_by: UserId,
    /// Sequence clock value assigned to the deletion.
    pub sequence_number: i64,
    /// When the deletion happened.
    pub deleted_at: DateTime<Utc>,
}

/// Record of a deleted single version.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VersionTombstone {
    /// The owning document.
    pub document_id: DocumentId,
    /// The deleted version number.
    pub version_number: i64,
    /// The user who deleted it.
    pub deleted_by: UserId,
    /// When the deletion happened.
    pub deleted_at: DateTime<Utc>,
}
