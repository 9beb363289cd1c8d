//! Document metadata entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use docvault_core::types::{DocumentId, FolderId, UserId};

/// A document stored in DocVault.
///
/// One row per logical item. The row carries the "current" pointer fields;
/// the content history lives in the versions collection. `sequence_number`
/// is the optimistic-concurrency baseline: it strictly increases on every
/// successful mutation of the row or its active version.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentMetadata {
    /// Unique document identifier, stable across versions.
    pub id: DocumentId,
    /// The folder containing this document.
    pub folder_id: FolderId,
    /// Display title.
    pub title: Option<String>,
    /// The file name (including extension). May be empty for items that
    /// carry no content, e.g. bare links.
    pub file_name: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// An associated URL (for link-type items).
    pub url: Option<String>,
    /// The user who created the document.
    pub created_by: UserId,
    /// The user who performed the last successful mutation.
    pub modified_by: UserId,
    /// When the document was created.
    pub creation_date: DateTime<Utc>,
    /// When the document was last modified.
    pub last_modified: DateTime<Utc>,
    /// Monotonic logical clock value at the last successful mutation.
    pub sequence_number: i64,
    /// The clock value assigned at creation. Used to partition delta
    /// results into new vs. modified.
    pub created_sequence: i64,
    /// The version number the document currently points to as active.
    /// 0 is the metadata-only placeholder.
    pub current_version: i64,
}

impl DocumentMetadata {
    /// Whether the document carries a non-empty file name.
    pub fn has_file_name(&self) -> bool {
        self.file_name.as_deref().is_some_and(|n| !n.is_empty())
    }

    /// Get the file extension (lowercase), if any.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name.as_deref()?;
        name.rsplit('.')
            .next()
            .filter(|ext| *ext != name)
            .map(|ext| ext.to_lowercase())
    }
}

/// Caller-supplied document state for `save`.
///
/// Carries the full desired values of the caller-editable fields; the
/// facade diffs them against the stored row to derive the changed-field
/// set for the update action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInput {
    /// The document to update, or `None` to create a new one.
    pub id: Option<DocumentId>,
    /// The folder to place the document in.
    pub folder_id: FolderId,
    /// Display title.
    pub title: Option<String>,
    /// The file name.
    pub file_name: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// An associated URL.
    pub url: Option<String>,
    /// MIME type of the supplied content, if any.
    pub mime_type: Option<String>,
}

impl DocumentInput {
    /// Input for a brand-new document in the given folder.
    pub fn create_in(folder_id: FolderId) -> Self {
        Self {
            id: None,
            folder_id,
            title: None,
            file_name: None,
            description: None,
            url: None,
            mime_type: None,
        }
    }

    /// Whether the input names an existing document.
    pub fn is_update(&self) -> bool {
        self.id.is_some()
    }

    /// Whether the input carries a non-empty file name.
    pub fn has_file_name(&self) -> bool {
        self.file_name.as_deref().is_some_and(|n| !n.is_empty())
    }
}
