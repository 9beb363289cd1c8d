//! Document-related domain events.

use serde::{Deserialize, Serialize};

use crate::types::{DocumentId, FolderId};

/// Events related to document operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DocumentEvent {
    /// A document was created.
    Created {
        /// The document ID.
        document_id: DocumentId,
        /// The folder containing the document.
        folder_id: FolderId,
        /// The file name (if any).
        file_name: Option<String>,
    },
    /// A document was modified (metadata or content).
    Modified {
        /// The document ID.
        document_id: DocumentId,
        /// The folder containing the document.
        folder_id: FolderId,
        /// The version number now current.
        current_version: i64,
    },
    /// A document was deleted, together with all its versions.
    Deleted {
        /// The document ID.
        document_id: DocumentId,
        /// The folder it was in.
        folder_id: FolderId,
        /// The file name (for display after deletion).
        file_name: Option<String>,
    },
}
