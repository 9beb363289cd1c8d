//! Batch document removal and single-version removal.
//!
//! Batch deletes screen every item before the transaction: anything the
//! caller may not delete, anything newer than the caller's sequence
//! baseline, and anything write-locked by another owner lands in the
//! rejected set and is skipped — partial success is the normal outcome,
//! not an error. Blob deletions are deferred until after commit.

use std::collections::BTreeSet;

use chrono::Utc;
use tracing::info;

use docvault_core::error::AppError;
use docvault_core::result::AppResult;
use docvault_core::types::{DocumentId, FolderId};
use docvault_database::actions::WriteAction;
use docvault_entity::document::field::DocumentField;
use docvault_entity::document::model::DocumentMetadata;

use crate::context::RequestContext;
use crate::document::cleanup::DeferredBlobDeletions;
use crate::document::service::DocumentService;

/// Removal operations over the document store.
#[derive(Debug, Clone)]
pub struct RemovalService {
    svc: DocumentService,
}

impl RemovalService {
    /// Create a removal service sharing the facade's components.
    pub fn new(svc: DocumentService) -> Self {
        Self { svc }
    }

    /// Delete every eligible document in a folder. Returns the ids that
    /// were rejected (permission denied, newer than `not_after`, or
    /// locked by another owner).
    pub async fn remove_documents(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
        not_after: i64,
    ) -> AppResult<Vec<DocumentId>> {
        let documents = self
            .svc
            .documents
            .find_by_folder(folder_id, &[], None, None)
            .await?;
        self.remove_rows(ctx, documents, not_after).await
    }

    /// Delete the given documents. Returns the ids that were rejected;
    /// ids that do not exist are reported as rejected as well so the
    /// caller can tell nothing happened for them.
    pub async fn remove_documents_by_id(
        &self,
        ctx: &RequestContext,
        ids: &[DocumentId],
        not_after: i64,
    ) -> AppResult<Vec<DocumentId>> {
        let found = self.svc.documents.find_by_ids(ids).await?;
        let mut rejected: Vec<DocumentId> = ids
            .iter()
            .filter(|id| !found.iter().any(|doc| doc.id == **id))
            .copied()
            .collect();
        rejected.extend(self.remove_rows(ctx, found, not_after).await?);
        Ok(rejected)
    }

    /// Screen, then delete the accepted rows in one transaction.
    async fn remove_rows(
        &self,
        ctx: &RequestContext,
        documents: Vec<DocumentMetadata>,
        not_after: i64,
    ) -> AppResult<Vec<DocumentId>> {
        let mut rejected = Vec::new();
        let mut accepted = Vec::new();

        for document in documents {
            if self.svc.gate.require_delete(ctx, &document).await.is_err() {
                rejected.push(document.id);
                continue;
            }
            if document.sequence_number > not_after {
                rejected.push(document.id);
                continue;
            }
            if self
                .svc
                .locks
                .blocking_lock(&document, ctx.user_id)
                .await?
                .is_some()
            {
                rejected.push(document.id);
                continue;
            }
            accepted.push(document);
        }

        if accepted.is_empty() {
            return Ok(rejected);
        }

        // Blob keys and deletion clock values are gathered before the
        // transaction; the single pool connection is owned by the
        // transaction once it begins.
        let mut deferred = DeferredBlobDeletions::new();
        let mut actions = Vec::with_capacity(accepted.len());
        for document in &accepted {
            deferred.defer_all(self.svc.versions.blob_keys(document.id).await?);
            let sequence_number = self.svc.ids.next_sequence().await?;
            actions.push(WriteAction::DeleteDocument {
                row: document.clone(),
                deleted_by: ctx.user_id,
                sequence_number,
            });
        }

        let mut tx = self.svc.pool.begin().await?;
        match self.svc.executor.execute_all(&mut tx, actions).await {
            Ok(()) => {
                tx.commit().await.map_err(|e| {
                    AppError::with_source(
                        docvault_core::error::ErrorKind::Database,
                        "Failed to commit batch delete",
                        e,
                    )
                })?;
            }
            Err(err) => {
                let _ = tx.rollback().await;
                // Nothing was deleted; the blobs stay referenced.
                deferred.discard();
                return Err(err);
            }
        }

        deferred.flush(self.svc.blobs.as_ref()).await;

        for document in &accepted {
            info!(
                user = %ctx.user_id,
                document_id = %document.id,
                folder_id = %document.folder_id,
                "Document deleted"
            );
            self.svc
                .notifier
                .deleted(
                    ctx.user_id,
                    document.id,
                    document.folder_id,
                    document.file_name.clone(),
                )
                .await;
        }

        Ok(rejected)
    }

    /// Delete individual versions of a document. Returns the version
    /// numbers that could not be removed (unknown, already deleted, or
    /// the protected version 0). Refuses the whole request — returning
    /// the full input unresolved — when the document is write-locked by
    /// another owner.
    ///
    /// Removing the currently active version promotes the highest
    /// surviving version: the document row takes over its file name
    /// (re-validated for uniqueness), title, description, and URL, and
    /// version 0 mirrors the promoted values.
    pub async fn remove_version(
        &self,
        ctx: &RequestContext,
        id: DocumentId,
        version_numbers: &[i64],
    ) -> AppResult<Vec<i64>> {
        let old = self.svc.load(id).await?;
        self.svc.gate.require_delete(ctx, &old).await?;

        if self
            .svc
            .locks
            .blocking_lock(&old, ctx.user_id)
            .await?
            .is_some()
        {
            return Ok(version_numbers.to_vec());
        }

        let live: BTreeSet<i64> = self.svc.versions.version_numbers(id).await?.into_iter().collect();

        let mut not_removed = Vec::new();
        let mut removable = BTreeSet::new();
        for &number in version_numbers {
            if number == 0 || !live.contains(&number) {
                if !not_removed.contains(&number) {
                    not_removed.push(number);
                }
            } else {
                removable.insert(number);
            }
        }
        if removable.is_empty() {
            return Ok(not_removed);
        }

        let surviving_max = live
            .iter()
            .filter(|n| !removable.contains(n))
            .max()
            .copied()
            .unwrap_or(0);
        let removing_current = removable.contains(&old.current_version);

        let now = Utc::now();
        let sequence = self.svc.ids.next_sequence().await?;
        let expected_sequence = old.sequence_number;

        let mut new = old.clone();
        new.modified_by = ctx.user_id;
        new.last_modified = now;
        new.sequence_number = sequence;

        let mut fields = Vec::new();
        if removing_current {
            new.current_version = surviving_max;

            let promoted = self.svc.versions.find(id, surviving_max).await?.ok_or_else(|| {
                AppError::inconsistent(format!(
                    "Version {surviving_max} of document {id} vanished during promotion"
                ))
            })?;

            if promoted.file_name != old.file_name {
                self.svc
                    .check_file_name(old.folder_id, promoted.file_name.as_deref(), Some(id))
                    .await?;
                new.file_name = promoted.file_name.clone();
                fields.push(DocumentField::FileName);
            }
            if promoted.title != old.title {
                new.title = promoted.title.clone();
                fields.push(DocumentField::Title);
            }
            if promoted.description != old.description {
                new.description = promoted.description.clone();
                fields.push(DocumentField::Description);
            }
            if promoted.url != old.url {
                new.url = promoted.url.clone();
                fields.push(DocumentField::Url);
            }
        }

        let mut deferred = DeferredBlobDeletions::new();
        let mut actions = Vec::new();
        for &number in &removable {
            let row = self.svc.versions.find(id, number).await?.ok_or_else(|| {
                AppError::inconsistent(format!(
                    "Version {number} of document {id} vanished during removal"
                ))
            })?;
            if let Some(key) = &row.blob_key {
                deferred.defer(key.clone());
            }
            actions.push(WriteAction::DeleteVersion {
                row,
                deleted_by: ctx.user_id,
            });
        }

        if removing_current {
            if let Some(action) = self
                .svc
                .copy_forward_action(&new, expected_sequence, now)
                .await?
            {
                actions.push(action);
            }
        }

        actions.push(WriteAction::UpdateDocument {
            old: Box::new(old),
            new: Box::new(new.clone()),
            fields,
            expected_sequence,
        });

        let mut tx = self.svc.pool.begin().await?;
        match self.svc.executor.execute_all(&mut tx, actions).await {
            Ok(()) => {
                tx.commit().await.map_err(|e| {
                    AppError::with_source(
                        docvault_core::error::ErrorKind::Database,
                        "Failed to commit version removal",
                        e,
                    )
                })?;
            }
            Err(err) => {
                let _ = tx.rollback().await;
                deferred.discard();
                return Err(err);
            }
        }

        deferred.flush(self.svc.blobs.as_ref()).await;

        info!(
            user = %ctx.user_id,
            document_id = %id,
            removed = removable.len(),
            current_version = new.current_version,
            "Versions removed"
        );
        self.svc.notifier.modified(ctx.user_id, &new).await;

        Ok(not_removed)
    }
}
