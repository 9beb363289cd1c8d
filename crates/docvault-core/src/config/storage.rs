//! Blob store configuration.

use serde::{Deserialize, Serialize};

/// Local blob store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for all stored blobs.
    #[serde(default = "default_root_path")]
    pub root_path: String,
    /// Per-owner storage quota in bytes. `None` means unlimited.
    #[serde(default)]
    pub default_quota_bytes: Option<u64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            default_quota_bytes: None,
        }
    }
}

fn default_root_path() -> String {
    "data/blobs".to_string()
}
