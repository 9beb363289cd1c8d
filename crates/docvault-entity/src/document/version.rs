//! Document version entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use docvault_core::traits::blob::BlobKey;
use docvault_core::types::{DocumentId, UserId};

/// A historical version of a document, keyed `(document_id, version_number)`.
///
/// Version numbering starts at 0: a metadata-only placeholder with no
/// attached blob that is always present. Title, description, and URL on
/// version 0 mirror the current version by copy-forward.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Version {
    /// The document this version belongs to.
    pub document_id: DocumentId,
    /// Sequential version number; 0 is the placeholder.
    pub version_number: i64,
    /// Display title at this version.
    pub title: Option<String>,
    /// Description at this version.
    pub description: Option<String>,
    /// Associated URL at this version.
    pub url: Option<String>,
    /// The file name at this version.
    pub file_name: Option<String>,
    /// Content size in bytes (0 for version 0).
    pub file_size: i64,
    /// MD5 checksum of the content.
    pub file_md5: Option<String>,
    /// MIME type of the content.
    pub mime_type: Option<String>,
    /// Key of the stored payload in the blob store. `None` for version 0.
    pub blob_key: Option<BlobKey>,
    /// User who created this version.
    pub created_by: UserId,
    /// When this version was created.
    pub creation_date: DateTime<Utc>,
    /// When this version row was last modified.
    pub last_modified: DateTime<Utc>,
}

impl Version {
    /// Whether this version carries stored content.
    pub fn has_content(&self) -> bool {
        self.blob_key.is_some()
    }

    /// Whether this is the metadata-only placeholder version.
    pub fn is_placeholder(&self) -> bool {
        self.version_number == 0
    }
}
