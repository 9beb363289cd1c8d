//! Document facade — the public read/save surface.
//!
//! Orchestrates the permission gate, lock manager, write-action pipeline,
//! and blob store into the store's public contract. The facade owns the
//! transaction boundary: blobs are written before any metadata
//! references them, and blob deletions are deferred until the metadata
//! transaction has committed.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use md5::{Digest, Md5};
use sqlx::SqlitePool;
use tracing::info;

use docvault_core::error::{AppError, ErrorKind};
use docvault_core::result::AppResult;
use docvault_core::traits::blob::{BlobKey, BlobStore, ByteStream};
use docvault_core::traits::events::EventSink;
use docvault_core::types::sorting::SortOrder;
use docvault_core::types::{DocumentId, FolderId};
use docvault_database::actions::{ActionExecutor, WriteAction};
use docvault_database::repositories::document::DocumentRepository;
use docvault_database::repositories::sequence::IdGenerator;
use docvault_database::repositories::tombstone::TombstoneRepository;
use docvault_database::repositories::version::VersionRepository;
use docvault_entity::document::delta::DocumentDelta;
use docvault_entity::document::field::{DocumentField, VersionField};
use docvault_entity::document::model::{DocumentInput, DocumentMetadata};
use docvault_entity::document::version::Version;

use crate::context::RequestContext;
use crate::document::cleanup::DeferredBlobDeletions;
use crate::lock::manager::LockManager;
use crate::notify::ChangeNotifier;
use crate::permission::gate::PermissionGate;
use crate::permission::resolver::RightsResolver;

/// The document store facade.
#[derive(Debug, Clone)]
pub struct DocumentService {
    pub(crate) pool: SqlitePool,
    pub(crate) documents: DocumentRepository,
    pub(crate) versions: VersionRepository,
    pub(crate) tombstones: TombstoneRepository,
    pub(crate) executor: ActionExecutor,
    pub(crate) ids: IdGenerator,
    pub(crate) blobs: Arc<dyn BlobStore>,
    pub(crate) gate: PermissionGate,
    pub(crate) locks: LockManager,
    pub(crate) notifier: ChangeNotifier,
}

impl DocumentService {
    /// Create the facade over a migrated pool, a blob store, and the
    /// external collaborators.
    pub fn new(
        pool: SqlitePool,
        blobs: Arc<dyn BlobStore>,
        resolver: Arc<dyn RightsResolver>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let gate = PermissionGate::new(resolver);
        Self {
            documents: DocumentRepository::new(pool.clone()),
            versions: VersionRepository::new(pool.clone()),
            tombstones: TombstoneRepository::new(pool.clone()),
            executor: ActionExecutor::new(),
            ids: IdGenerator::new(pool.clone()),
            blobs,
            locks: LockManager::new(pool.clone(), gate.clone()),
            gate,
            notifier: ChangeNotifier::new(sink),
            pool,
        }
    }

    /// The permission gate (shared with the other services).
    pub fn gate(&self) -> &PermissionGate {
        &self.gate
    }

    /// The lock manager bound to this store.
    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    // -- Reads --

    /// Get a document's metadata.
    pub async fn get_metadata(
        &self,
        ctx: &RequestContext,
        id: DocumentId,
    ) -> AppResult<DocumentMetadata> {
        let document = self.load(id).await?;
        self.gate.require_read(ctx, &document).await?;
        Ok(document)
    }

    /// Get several documents' metadata at once. Documents the caller may
    /// not read are omitted.
    pub async fn get_documents(
        &self,
        ctx: &RequestContext,
        ids: &[DocumentId],
    ) -> AppResult<Vec<DocumentMetadata>> {
        let mut readable = Vec::new();
        for document in self.documents.find_by_ids(ids).await? {
            if self.gate.require_read(ctx, &document).await.is_ok() {
                readable.push(document);
            }
        }
        Ok(readable)
    }

    /// Whether a document exists (regardless of read permission).
    pub async fn exists(&self, id: DocumentId) -> AppResult<bool> {
        Ok(self.documents.sequence_number_of(id).await?.is_some())
    }

    /// Get one version row of a document.
    pub async fn get_version(
        &self,
        ctx: &RequestContext,
        id: DocumentId,
        version_number: i64,
    ) -> AppResult<Version> {
        let document = self.load(id).await?;
        self.gate.require_read(ctx, &document).await?;
        self.versions
            .find(id, version_number)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Version {version_number} of document {id} not found"))
            })
    }

    /// Get a document's content as a byte stream. `version` defaults to
    /// the current version.
    pub async fn get_content(
        &self,
        ctx: &RequestContext,
        id: DocumentId,
        version: Option<i64>,
    ) -> AppResult<ByteStream> {
        let document = self.load(id).await?;
        self.gate.require_read(ctx, &document).await?;

        let version_number = version.unwrap_or(document.current_version);
        let version = self.versions.find(id, version_number).await?.ok_or_else(|| {
            AppError::not_found(format!("Version {version_number} of document {id} not found"))
        })?;

        let key = version.blob_key.ok_or_else(|| {
            AppError::not_found(format!(
                "Version {version_number} of document {id} carries no content"
            ))
        })?;

        match self.blobs.get(&key).await {
            Ok(stream) => Ok(stream),
            // The metadata references a blob the store no longer has:
            // an administrative repair is needed, never silently fixed.
            Err(err) if err.kind == ErrorKind::NotFound => Err(AppError::inconsistent(format!(
                "Blob {key} referenced by document {id} version {version_number} is missing"
            ))),
            Err(err) => Err(err),
        }
    }

    /// List documents in a folder with projection and optional sort.
    /// Callers holding read-own-only see only their own items.
    pub async fn list_documents(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
        columns: &[DocumentField],
        sort: Option<SortOrder<DocumentField>>,
    ) -> AppResult<Vec<DocumentMetadata>> {
        let rights = self.gate.require_folder_read(ctx, folder_id).await?;
        let owner_scope = rights.reads_own_only().then_some(ctx.user_id);
        self.documents
            .find_by_folder(folder_id, columns, sort, owner_scope)
            .await
    }

    /// List a document's versions with projection and optional sort.
    pub async fn list_versions(
        &self,
        ctx: &RequestContext,
        id: DocumentId,
        columns: &[VersionField],
        sort: Option<SortOrder<VersionField>>,
    ) -> AppResult<Vec<Version>> {
        let document = self.load(id).await?;
        self.gate.require_read(ctx, &document).await?;
        self.versions.find_all(id, columns, sort).await
    }

    /// Count the documents visible to the caller in a folder.
    pub async fn count_documents(&self, ctx: &RequestContext, folder_id: FolderId) -> AppResult<i64> {
        let rights = self.gate.require_folder_read(ctx, folder_id).await?;
        let owner_scope = rights.reads_own_only().then_some(ctx.user_id);
        self.documents.count_by_folder(folder_id, owner_scope).await
    }

    /// Whether the folder holds no live documents.
    pub async fn is_folder_empty(&self, ctx: &RequestContext, folder_id: FolderId) -> AppResult<bool> {
        self.gate.require_folder_read(ctx, folder_id).await?;
        self.documents.is_folder_empty(folder_id).await
    }

    /// Whether the folder holds live documents created by someone other
    /// than the caller.
    pub async fn has_foreign_objects(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
    ) -> AppResult<bool> {
        self.gate.require_folder_read(ctx, folder_id).await?;
        self.documents.has_foreign_objects(folder_id, ctx.user_id).await
    }

    /// Changes in a folder relative to a prior sequence number, as
    /// disjoint new/modified/deleted sets.
    pub async fn delta(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
        since: i64,
    ) -> AppResult<DocumentDelta> {
        let rights = self.gate.require_folder_read(ctx, folder_id).await?;
        let owner_scope = rights.reads_own_only().then_some(ctx.user_id);

        let changed = self
            .documents
            .find_changed_since(folder_id, since, owner_scope)
            .await?;
        let deleted = self
            .tombstones
            .find_documents_deleted_since(folder_id, since, owner_scope)
            .await?;

        let mut delta = DocumentDelta {
            deleted,
            ..DocumentDelta::default()
        };
        for document in changed {
            if document.created_sequence > since {
                delta.new.push(document);
            } else {
                delta.modified.push(document);
            }
        }
        Ok(delta)
    }

    // -- Save --

    /// Create or update a document.
    ///
    /// Creates when `input.id` is unset, else updates. Enforces
    /// permission, lock, filename-uniqueness, and optimistic-concurrency
    /// checks; on success bumps the sequence number, advances the current
    /// version if content was supplied, and notifies listeners.
    pub async fn save(
        &self,
        ctx: &RequestContext,
        input: DocumentInput,
        content: Option<Bytes>,
        expected_sequence: Option<i64>,
    ) -> AppResult<DocumentMetadata> {
        match input.id {
            None => self.create(ctx, input, content).await,
            Some(id) => self.update(ctx, id, input, content, expected_sequence).await,
        }
    }

    /// Create path: document row plus version 0 first, in one committed
    /// transaction, then content. If the content step fails the document
    /// survives in a valid, contentless state instead of referencing a
    /// version that never came to be.
    async fn create(
        &self,
        ctx: &RequestContext,
        input: DocumentInput,
        content: Option<Bytes>,
    ) -> AppResult<DocumentMetadata> {
        self.gate.require_create(ctx, input.folder_id).await?;
        self.check_file_name(input.folder_id, input.file_name.as_deref(), None).await?;

        let id = self.ids.next_document_id().await?;
        let sequence = self.ids.next_sequence().await?;
        let now = Utc::now();

        let document = DocumentMetadata {
            id,
            folder_id: input.folder_id,
            title: input.title.clone(),
            file_name: input.file_name.clone(),
            description: input.description.clone(),
            url: input.url.clone(),
            created_by: ctx.user_id,
            modified_by: ctx.user_id,
            creation_date: now,
            last_modified: now,
            sequence_number: sequence,
            created_sequence: sequence,
            current_version: 0,
        };
        let placeholder = Version {
            document_id: id,
            version_number: 0,
            title: input.title.clone(),
            description: input.description.clone(),
            url: input.url.clone(),
            file_name: input.file_name.clone(),
            file_size: 0,
            file_md5: None,
            mime_type: None,
            blob_key: None,
            created_by: ctx.user_id,
            creation_date: now,
            last_modified: now,
        };

        let mut tx = self.pool.begin().await?;
        self.executor
            .execute_all(
                &mut tx,
                vec![
                    WriteAction::CreateDocument {
                        row: document.clone(),
                    },
                    WriteAction::CreateVersion { row: placeholder },
                ],
            )
            .await?;
        tx.commit().await?;

        let document = match content {
            None => document,
            Some(data) => {
                self.attach_content(ctx, document, data, input.mime_type.clone())
                    .await?
            }
        };

        info!(
            user = %ctx.user_id,
            document_id = %document.id,
            folder_id = %document.folder_id,
            version = document.current_version,
            "Document created"
        );
        self.notifier.created(ctx.user_id, &document).await;
        Ok(document)
    }

    /// Attach a first/new content payload to a committed document row.
    /// Blob first, then version row plus current-version advance in one
    /// transaction; a failed transaction queues the orphaned blob for
    /// best-effort deletion.
    async fn attach_content(
        &self,
        ctx: &RequestContext,
        old: DocumentMetadata,
        data: Bytes,
        mime_type: Option<String>,
    ) -> AppResult<DocumentMetadata> {
        let file_size = data.len() as i64;
        let file_md5 = md5_hex(&data);
        let blob_key = self.blobs.put_bytes(ctx.user_id, data).await?;

        let version_number = self.versions.max_version_number(old.id).await? + 1;
        let sequence = self.ids.next_sequence().await?;
        let now = Utc::now();

        let version = Version {
            document_id: old.id,
            version_number,
            title: old.title.clone(),
            description: old.description.clone(),
            url: old.url.clone(),
            file_name: old.file_name.clone(),
            file_size,
            file_md5: Some(file_md5),
            mime_type,
            blob_key: Some(blob_key.clone()),
            created_by: ctx.user_id,
            creation_date: now,
            last_modified: now,
        };

        let mut new = old.clone();
        new.modified_by = ctx.user_id;
        new.last_modified = now;
        new.sequence_number = sequence;
        new.current_version = version_number;

        let expected_sequence = old.sequence_number;
        let actions = vec![
            WriteAction::CreateVersion { row: version },
            WriteAction::UpdateDocument {
                old: Box::new(old),
                new: Box::new(new.clone()),
                fields: Vec::new(),
                expected_sequence,
            },
        ];

        self.run_in_transaction(actions, Some(blob_key)).await?;
        Ok(new)
    }

    /// Update path: blob (if any) outside the transaction first, then
    /// version rows and the conditioned document update inside it.
    async fn update(
        &self,
        ctx: &RequestContext,
        id: DocumentId,
        input: DocumentInput,
        content: Option<Bytes>,
        expected_sequence: Option<i64>,
    ) -> AppResult<DocumentMetadata> {
        let old = self.load(id).await?;
        self.gate.require_write(ctx, &old).await?;

        if let Some(lock) = self.locks.blocking_lock(&old, ctx.user_id).await? {
            return Err(AppError::locked(format!(
                "Document {id} is locked by user {}",
                lock.owner
            )));
        }

        let expected = expected_sequence
            .ok_or_else(|| AppError::validation("Updates require the expected sequence number"))?;
        if expected != old.sequence_number {
            return Err(AppError::conflict(format!("Document {id} has changed")));
        }

        // Diff the caller-editable fields against the stored row.
        let mut fields = Vec::new();
        if input.folder_id != old.folder_id {
            fields.push(DocumentField::FolderId);
        }
        if input.title != old.title {
            fields.push(DocumentField::Title);
        }
        if input.file_name != old.file_name {
            fields.push(DocumentField::FileName);
        }
        if input.description != old.description {
            fields.push(DocumentField::Description);
        }
        if input.url != old.url {
            fields.push(DocumentField::Url);
        }

        if fields.is_empty() && content.is_none() {
            return Ok(old);
        }

        // A move also needs create rights on the target folder.
        if fields.contains(&DocumentField::FolderId) {
            self.gate.require_create(ctx, input.folder_id).await?;
        }
        if fields.contains(&DocumentField::FileName) || fields.contains(&DocumentField::FolderId) {
            self.check_file_name(input.folder_id, input.file_name.as_deref(), Some(id))
                .await?;
        }

        let now = Utc::now();
        let sequence = self.ids.next_sequence().await?;

        let mut new = old.clone();
        new.folder_id = input.folder_id;
        new.title = input.title.clone();
        new.file_name = input.file_name.clone();
        new.description = input.description.clone();
        new.url = input.url.clone();
        new.modified_by = ctx.user_id;
        new.last_modified = now;
        new.sequence_number = sequence;

        let mut actions = Vec::new();
        let mut new_blob = None;

        if let Some(data) = content {
            let file_size = data.len() as i64;
            let file_md5 = md5_hex(&data);
            let blob_key = self.blobs.put_bytes(ctx.user_id, data).await?;
            new_blob = Some(blob_key.clone());

            let version_number = self.versions.max_version_number(id).await? + 1;
            new.current_version = version_number;

            actions.push(WriteAction::CreateVersion {
                row: Version {
                    document_id: id,
                    version_number,
                    title: new.title.clone(),
                    description: new.description.clone(),
                    url: new.url.clone(),
                    file_name: new.file_name.clone(),
                    file_size,
                    file_md5: Some(file_md5),
                    mime_type: input.mime_type.clone(),
                    blob_key: Some(blob_key),
                    created_by: ctx.user_id,
                    creation_date: now,
                    last_modified: now,
                },
            });
        }

        // Version 0 mirrors title/description/url of the current version
        // by copy-forward. Conditioned on the same baseline, and ordered
        // before the document update bumps the clock.
        if let Some(action) = self.copy_forward_action(&new, expected, now).await? {
            actions.push(action);
        }

        actions.push(WriteAction::UpdateDocument {
            old: Box::new(old),
            new: Box::new(new.clone()),
            fields,
            expected_sequence: expected,
        });

        self.run_in_transaction(actions, new_blob).await?;

        info!(
            user = %ctx.user_id,
            document_id = %id,
            version = new.current_version,
            sequence = new.sequence_number,
            "Document updated"
        );
        self.notifier.modified(ctx.user_id, &new).await;
        Ok(new)
    }

    /// Build the copy-forward update for version 0, if its mirror fields
    /// differ from the desired document state.
    pub(crate) async fn copy_forward_action(
        &self,
        new: &DocumentMetadata,
        expected_sequence: i64,
        now: chrono::DateTime<Utc>,
    ) -> AppResult<Option<WriteAction>> {
        let Some(placeholder) = self.versions.find(new.id, 0).await? else {
            return Ok(None);
        };

        let mut fields = Vec::new();
        if placeholder.title != new.title {
            fields.push(VersionField::Title);
        }
        if placeholder.description != new.description {
            fields.push(VersionField::Description);
        }
        if placeholder.url != new.url {
            fields.push(VersionField::Url);
        }
        if fields.is_empty() {
            return Ok(None);
        }

        let mut updated = placeholder.clone();
        updated.title = new.title.clone();
        updated.description = new.description.clone();
        updated.url = new.url.clone();
        updated.last_modified = now;

        Ok(Some(WriteAction::UpdateVersion {
            old: Box::new(placeholder),
            new: Box::new(updated),
            fields,
            expected_sequence,
        }))
    }

    /// Execute actions inside one transaction. On failure the new blob
    /// (if any) is queued for deferred deletion and flushed after the
    /// rollback — never deleted inside the failed transaction.
    pub(crate) async fn run_in_transaction(
        &self,
        actions: Vec<WriteAction>,
        new_blob: Option<BlobKey>,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        let result = self.executor.execute_all(&mut tx, actions).await;

        match result {
            Ok(()) => match tx.commit().await {
                Ok(()) => Ok(()),
                Err(err) => {
                    self.reap_orphan(new_blob).await;
                    Err(AppError::with_source(
                        ErrorKind::Database,
                        "Failed to commit transaction",
                        err,
                    ))
                }
            },
            Err(err) => {
                let _ = tx.rollback().await;
                self.reap_orphan(new_blob).await;
                Err(err)
            }
        }
    }

    async fn reap_orphan(&self, blob: Option<BlobKey>) {
        if let Some(key) = blob {
            let mut deferred = DeferredBlobDeletions::new();
            deferred.defer(key);
            deferred.flush(self.blobs.as_ref()).await;
        }
    }

    /// Enforce the folder-scoped filename-uniqueness invariant. Empty
    /// and missing names are exempt.
    pub(crate) async fn check_file_name(
        &self,
        folder_id: FolderId,
        file_name: Option<&str>,
        exclude: Option<DocumentId>,
    ) -> AppResult<()> {
        let Some(name) = file_name.filter(|n| !n.is_empty()) else {
            return Ok(());
        };
        if let Some(existing) = self
            .documents
            .find_duplicate_file_name(folder_id, name, exclude)
            .await?
        {
            return Err(AppError::duplicate_filename(format!(
                "File name '{name}' is already used by document {existing} in folder {folder_id}"
            )));
        }
        Ok(())
    }

    pub(crate) async fn load(&self, id: DocumentId) -> AppResult<DocumentMetadata> {
        self.documents
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Document {id} not found")))
    }
}

/// Hex-encoded MD5 of a payload, recorded on version rows. The blob
/// store itself stays checksum-agnostic.
pub(crate) fn md5_hex(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
