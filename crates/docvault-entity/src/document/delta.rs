//! Delta result: the new/modified/deleted partition of a folder.

use serde::{Deserialize, Serialize};

use super::model::DocumentMetadata;
use super::tombstone::DocumentTombstone;

/// Changes in a folder relative to a prior sequence number.
///
/// The three sets are disjoint: a document appears in exactly one of
/// them for a given baseline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentDelta {
    /// Documents created after the baseline.
    pub new: Vec<DocumentMetadata>,
    /// Documents created before but mutated after the baseline.
    pub modified: Vec<DocumentMetadata>,
    /// Documents deleted after the baseline.
    pub deleted: Vec<DocumentTombstone>,
}

impl DocumentDelta {
    /// Whether the delta carries no changes at all.
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}
