//! Permission gate — fail-fast rights checks before any mutation.

use std::sync::Arc;

use docvault_core::error::AppError;
use docvault_core::result::AppResult;
use docvault_core::types::{FolderId, UserId};
use docvault_entity::document::model::DocumentMetadata;
use docvault_entity::rights::RightsSet;

use crate::context::RequestContext;
use super::resolver::RightsResolver;

/// Computes and enforces effective rights for a caller against folders
/// and documents.
///
/// All mutating operations check the appropriate right before touching
/// the write pipeline and fail fast with `PermissionDenied` — no partial
/// side effects on denial.
#[derive(Debug, Clone)]
pub struct PermissionGate {
    resolver: Arc<dyn RightsResolver>,
}

impl PermissionGate {
    /// Create a gate over the given resolver.
    pub fn new(resolver: Arc<dyn RightsResolver>) -> Self {
        Self { resolver }
    }

    /// The caller's effective rights on a folder.
    pub async fn rights(&self, folder_id: FolderId, user: UserId) -> AppResult<RightsSet> {
        self.resolver.effective_rights(folder_id, user).await
    }

    /// Require read access to a document.
    pub async fn require_read(
        &self,
        ctx: &RequestContext,
        document: &DocumentMetadata,
    ) -> AppResult<RightsSet> {
        let rights = self.rights(document.folder_id, ctx.user_id).await?;
        if !rights.can_read_item(document.created_by, ctx.user_id) {
            return Err(AppError::permission_denied(format!(
                "User {} may not read document {}",
                ctx.user_id, document.id
            )));
        }
        Ok(rights)
    }

    /// Require write access to a document.
    pub async fn require_write(
        &self,
        ctx: &RequestContext,
        document: &DocumentMetadata,
    ) -> AppResult<RightsSet> {
        let rights = self.rights(document.folder_id, ctx.user_id).await?;
        if !rights.can_write_item(document.created_by, ctx.user_id) {
            return Err(AppError::permission_denied(format!(
                "User {} may not modify document {}",
                ctx.user_id, document.id
            )));
        }
        Ok(rights)
    }

    /// Require delete access to a document.
    pub async fn require_delete(
        &self,
        ctx: &RequestContext,
        document: &DocumentMetadata,
    ) -> AppResult<RightsSet> {
        let rights = self.rights(document.folder_id, ctx.user_id).await?;
        if !rights.can_delete_item(document.created_by, ctx.user_id) {
            return Err(AppError::permission_denied(format!(
                "User {} may not delete document {}",
                ctx.user_id, document.id
            )));
        }
        Ok(rights)
    }

    /// Require the right to create new items in a folder.
    pub async fn require_create(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
    ) -> AppResult<RightsSet> {
        let rights = self.rights(folder_id, ctx.user_id).await?;
        if !rights.create {
            return Err(AppError::permission_denied(format!(
                "User {} may not create documents in folder {folder_id}",
                ctx.user_id
            )));
        }
        Ok(rights)
    }

    /// Require any read grant on a folder (for listings); returns the
    /// rights so the caller can scope the query to own items if needed.
    pub async fn require_folder_read(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
    ) -> AppResult<RightsSet> {
        let rights = self.rights(folder_id, ctx.user_id).await?;
        if !rights.admin && !rights.read.is_granted() {
            return Err(AppError::permission_denied(format!(
                "User {} may not read folder {folder_id}",
                ctx.user_id
            )));
        }
        Ok(rights)
    }
}
