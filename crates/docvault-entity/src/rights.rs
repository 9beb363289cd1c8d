//! Effective-rights value objects.
//!
//! Rights are computed by an external folder/permission resolver and
//! evaluated here as pure functions over the rights set plus item
//! ownership. "Read own objects only" is a distinct, narrower right from
//! "read all objects" and changes which listing and delta queries are
//! issued (owner-scoped vs. folder-scoped).

use serde::{Deserialize, Serialize};

use docvault_core::types::UserId;

/// How far a granted right reaches within a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessScope {
    /// No access.
    None,
    /// Access limited to items the caller created.
    Own,
    /// Access to all items in the folder.
    All,
}

impl AccessScope {
    /// Whether the scope permits acting on an item created by `item_owner`.
    pub fn permits(&self, item_owner: UserId, caller: UserId) -> bool {
        match self {
            Self::None => false,
            Self::Own => item_owner == caller,
            Self::All => true,
        }
    }

    /// Whether the scope grants anything at all.
    pub fn is_granted(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Effective rights of one caller against one folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RightsSet {
    /// May create new items in the folder.
    pub create: bool,
    /// Read reach over existing items.
    pub read: AccessScope,
    /// Write reach over existing items.
    pub write: AccessScope,
    /// Delete reach over existing items.
    pub delete: AccessScope,
    /// Folder administrator (bypasses per-item scoping).
    pub admin: bool,
}

impl RightsSet {
    /// Full rights, as held by a folder owner or administrator.
    pub fn full() -> Self {
        Self {
            create: true,
            read: AccessScope::All,
            write: AccessScope::All,
            delete: AccessScope::All,
            admin: true,
        }
    }

    /// No rights at all.
    pub fn none() -> Self {
        Self {
            create: false,
            read: AccessScope::None,
            write: AccessScope::None,
            delete: AccessScope::None,
            admin: false,
        }
    }

    /// Contributor rights: create plus full control over own items only.
    pub fn own_only() -> Self {
        Self {
            create: true,
            read: AccessScope::Own,
            write: AccessScope::Own,
            delete: AccessScope::Own,
            admin: false,
        }
    }

    /// Read-only rights over the whole folder.
    pub fn read_all() -> Self {
        Self {
            create: false,
            read: AccessScope::All,
            write: AccessScope::None,
            delete: AccessScope::None,
            admin: false,
        }
    }

    /// Whether the caller may read an item created by `item_owner`.
    pub fn can_read_item(&self, item_owner: UserId, caller: UserId) -> bool {
        self.admin || self.read.permits(item_owner, caller)
    }

    /// Whether the caller may write an item created by `item_owner`.
    pub fn can_write_item(&self, item_owner: UserId, caller: UserId) -> bool {
        self.admin || self.write.permits(item_owner, caller)
    }

    /// Whether the caller may delete an item created by `item_owner`.
    pub fn can_delete_item(&self, item_owner: UserId, caller: UserId) -> bool {
        self.admin || self.delete.permits(item_owner, caller)
    }

    /// Whether listing and delta queries must be scoped to the caller's
    /// own items.
    pub fn reads_own_only(&self) -> bool {
        !self.admin && self.read == AccessScope::Own
    }
}
