//! Rights resolver — the boundary to the external folder/permission
//! system.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use docvault_core::result::AppResult;
use docvault_core::types::{FolderId, UserId};
use docvault_entity::rights::RightsSet;

/// Computes the effective rights of a caller against a folder.
///
/// Folder trees, group memberships, and sharing rules live outside this
/// store; implementations translate them into one [`RightsSet`] per
/// `(folder, user)` pair.
#[async_trait]
pub trait RightsResolver: Send + Sync + std::fmt::Debug + 'static {
    /// Resolve the caller's effective rights on a folder.
    async fn effective_rights(&self, folder_id: FolderId, user: UserId) -> AppResult<RightsSet>;
}

/// An in-memory rights table with a configurable default.
///
/// Used by embedders without a folder system of their own and by tests.
#[derive(Debug)]
pub struct StaticRightsResolver {
    grants: RwLock<HashMap<(FolderId, UserId), RightsSet>>,
    default: RightsSet,
}

impl StaticRightsResolver {
    /// Create a resolver returning `default` for unknown pairs.
    pub fn new(default: RightsSet) -> Self {
        Self {
            grants: RwLock::new(HashMap::new()),
            default,
        }
    }

    /// A resolver granting full rights to everyone.
    pub fn allowing_all() -> Self {
        Self::new(RightsSet::full())
    }

    /// A resolver granting nothing by default.
    pub fn denying_all() -> Self {
        Self::new(RightsSet::none())
    }

    /// Record the rights of one user on one folder.
    pub fn grant(&self, folder_id: FolderId, user: UserId, rights: RightsSet) {
        self.grants
            .write()
            .expect("rights table poisoned")
            .insert((folder_id, user), rights);
    }
}

#[async_trait]
impl RightsResolver for StaticRightsResolver {
    async fn effective_rights(&self, folder_id: FolderId, user: UserId) -> AppResult<RightsSet> {
        let grants = self.grants.read().expect("rights table poisoned");
        Ok(grants.get(&(folder_id, user)).copied().unwrap_or(self.default))
    }
}
