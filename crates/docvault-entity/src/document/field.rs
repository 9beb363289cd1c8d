//! Typed column enums for projection, sorting, and update field sets.
//!
//! Repositories and the write-action executor build SQL from these enums
//! only, never from caller-supplied strings.

use serde::{Deserialize, Serialize};

/// Columns of the documents collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentField {
    /// Document identifier.
    Id,
    /// Containing folder.
    FolderId,
    /// Display title.
    Title,
    /// File name.
    FileName,
    /// Description.
    Description,
    /// Associated URL.
    Url,
    /// Creator.
    CreatedBy,
    /// Last modifier.
    ModifiedBy,
    /// Creation timestamp.
    CreationDate,
    /// Last-modified timestamp.
    LastModified,
    /// Optimistic-concurrency sequence number.
    SequenceNumber,
    /// Active version pointer.
    CurrentVersion,
}

impl DocumentField {
    /// The SQL column name.
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::FolderId => "folder_id",
            Self::Title => "title",
            Self::FileName => "file_name",
            Self::Description => "description",
            Self::Url => "url",
            Self::CreatedBy => "created_by",
            Self::ModifiedBy => "modified_by",
            Self::CreationDate => "creation_date",
            Self::LastModified => "last_modified",
            Self::SequenceNumber => "sequence_number",
            Self::CurrentVersion => "current_version",
        }
    }

    /// All columns, in row order.
    pub fn all() -> &'static [DocumentField] {
        &[
            Self::Id,
            Self::FolderId,
            Self::Title,
            Self::FileName,
            Self::Description,
            Self::Url,
            Self::CreatedBy,
            Self::ModifiedBy,
            Self::CreationDate,
            Self::LastModified,
            Self::SequenceNumber,
            Self::CurrentVersion,
        ]
    }

    /// The caller-editable columns considered by old/new diffing.
    pub fn editable() -> &'static [DocumentField] {
        &[Self::FolderId, Self::Title, Self::FileName, Self::Description, Self::Url]
    }
}

/// Columns of the versions collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionField {
    /// Owning document.
    DocumentId,
    /// Version number.
    VersionNumber,
    /// Display title at this version.
    Title,
    /// Description at this version.
    Description,
    /// Associated URL at this version.
    Url,
    /// File name.
    FileName,
    /// Content size in bytes.
    FileSize,
    /// MD5 checksum.
    FileMd5,
    /// MIME type.
    MimeType,
    /// Blob store key.
    BlobKey,
    /// Creator.
    CreatedBy,
    /// Creation timestamp.
    CreationDate,
    /// Last-modified timestamp.
    LastModified,
}

impl VersionField {
    /// The SQL column name.
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::DocumentId => "document_id",
            Self::VersionNumber => "version_number",
            Self::Title => "title",
            Self::Description => "description",
            Self::Url => "url",
            Self::FileName => "file_name",
            Self::FileSize => "file_size",
            Self::FileMd5 => "file_md5",
            Self::MimeType => "mime_type",
            Self::BlobKey => "blob_key",
            Self::CreatedBy => "created_by",
            Self::CreationDate => "creation_date",
            Self::LastModified => "last_modified",
        }
    }

    /// All columns, in row order.
    pub fn all() -> &'static [VersionField] {
        &[
            Self::DocumentId,
            Self::VersionNumber,
            Self::Title,
            Self::Description,
            Self::Url,
            Self::FileName,
            Self::FileSize,
            Self::FileMd5,
            Self::MimeType,
            Self::BlobKey,
            Self::CreatedBy,
            Self::CreationDate,
            Self::LastModified,
        ]
    }
}
