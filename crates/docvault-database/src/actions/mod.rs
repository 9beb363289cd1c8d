//! Write-action pipeline over the metadata store.
//!
//! Every metadata mutation is expressed as a [`WriteAction`] and executed
//! by the [`ActionExecutor`] — the only code in the workspace that issues
//! metadata writes. Actions do not manage transactions; the caller wraps
//! a sequence of actions in one transaction and owns commit/rollback.
//!
//! Update actions carry the old row snapshot, the new row, the changed
//! field set, and the expected sequence number. The update statement is
//! conditioned on the stored sequence number still matching; a stale
//! baseline affects zero rows and surfaces as a conflict without writing
//! anything.

use chrono::Utc;
use sqlx::{Sqlite, Transaction};

use docvault_core::error::AppError;
use docvault_core::result::AppResult;
use docvault_core::types::UserId;
use docvault_entity::document::field::{DocumentField, VersionField};
use docvault_entity::document::model::DocumentMetadata;
use docvault_entity::document::version::Version;

/// A single write operation over a document or version row.
#[derive(Debug, Clone)]
pub enum WriteAction {
    /// Insert a new document row.
    CreateDocument {
        /// The row to insert.
        row: DocumentMetadata,
    },
    /// Insert a new version row.
    CreateVersion {
        /// The row to insert.
        row: Version,
    },
    /// Update a document row, conditioned on the optimistic baseline.
    UpdateDocument {
        /// The row as the caller last saw it.
        old: Box<DocumentMetadata>,
        /// The desired row state. The clock fields (`sequence_number`,
        /// `modified_by`, `last_modified`, `current_version`) are always
        /// written from here.
        new: Box<DocumentMetadata>,
        /// The changed editable columns, derived by old/new diffing.
        fields: Vec<DocumentField>,
        /// The sequence number the stored row must still carry.
        expected_sequence: i64,
    },
    /// Update a version row, conditioned on the owning document's
    /// sequence number (version rows carry no clock of their own).
    UpdateVersion {
        /// The row as the caller last saw it.
        old: Box<Version>,
        /// The desired row state.
        new: Box<Version>,
        /// The changed columns.
        fields: Vec<VersionField>,
        /// The sequence number the owning document must still carry.
        expected_sequence: i64,
    },
    /// Delete a document row, recording a tombstone and clearing locks.
    /// Version rows cascade.
    DeleteDocument {
        /// The row being deleted.
        row: DocumentMetadata,
        /// The user performing the deletion.
        deleted_by: UserId,
        /// The sequence clock value assigned to the deletion.
        sequence_number: i64,
    },
    /// Delete a single version row, recording a tombstone.
    DeleteVersion {
        /// The row being deleted.
        row: Version,
        /// The user performing the deletion.
        deleted_by: UserId,
    },
}

/// Executes [`WriteAction`]s inside a caller-owned transaction.
#[derive(Debug, Clone, Default)]
pub struct ActionExecutor;

impl ActionExecutor {
    /// Create a new executor.
    pub fn new() -> Self {
        Self
    }

    /// Execute a single action.
    pub async fn execute(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        action: WriteAction,
    ) -> AppResult<()> {
        match action {
            WriteAction::CreateDocument { row } => self.create_document(tx, row).await,
            WriteAction::CreateVersion { row } => self.create_version(tx, row).await,
            WriteAction::UpdateDocument {
                old,
                new,
                fields,
                expected_sequence,
            } => {
                self.update_document(tx, &old, &new, &fields, expected_sequence)
                    .await
            }
            WriteAction::UpdateVersion {
                old,
                new,
                fields,
                expected_sequence,
            } => {
                self.update_version(tx, &old, &new, &fields, expected_sequence)
                    .await
            }
            WriteAction::DeleteDocument {
                row,
                deleted_by,
                sequence_number,
            } => {
                self.delete_document(tx, &row, deleted_by, sequence_number)
                    .await
            }
            WriteAction::DeleteVersion { row, deleted_by } => {
                self.delete_version(tx, &row, deleted_by).await
            }
        }
    }

    /// Execute a sequence of actions in order, stopping at the first
    /// failure.
    pub async fn execute_all(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        actions: Vec<WriteAction>,
    ) -> AppResult<()> {
        for action in actions {
            self.execute(tx, action).await?;
        }
        Ok(())
    }

    async fn create_document(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        row: DocumentMetadata,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO documents \
             (id, folder_id, title, file_name, description, url, created_by, modified_by, \
              creation_date, last_modified, sequence_number, created_sequence, current_version) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(row.id)
        .bind(row.folder_id)
        .bind(row.title)
        .bind(row.file_name)
        .bind(row.description)
        .bind(row.url)
        .bind(row.created_by)
        .bind(row.modified_by)
        .bind(row.creation_date)
        .bind(row.last_modified)
        .bind(row.sequence_number)
        .bind(row.created_sequence)
        .bind(row.current_version)
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::with_source(
            docvault_core::error::ErrorKind::Database,
            "Failed to insert document",
            e,
        ))?;
        Ok(())
    }

    async fn create_version(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        row: Version,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO versions \
             (document_id, version_number, title, description, url, file_name, file_size, \
              file_md5, mime_type, blob_key, created_by, creation_date, last_modified) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(row.document_id)
        .bind(row.version_number)
        .bind(row.title)
        .bind(row.description)
        .bind(row.url)
        .bind(row.file_name)
        .bind(row.file_size)
        .bind(row.file_md5)
        .bind(row.mime_type)
        .bind(row.blob_key)
        .bind(row.created_by)
        .bind(row.creation_date)
        .bind(row.last_modified)
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::with_source(
            docvault_core::error::ErrorKind::Database,
            "Failed to insert version",
            e,
        ))?;
        Ok(())
    }

    async fn update_document(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        old: &DocumentMetadata,
        new: &DocumentMetadata,
        fields: &[DocumentField],
        expected_sequence: i64,
    ) -> AppResult<()> {
        let mut sql = String::from(
            "UPDATE documents SET modified_by = ?, last_modified = ?, \
             sequence_number = ?, current_version = ?",
        );
        for field in fields {
            sql.push_str(", ");
            sql.push_str(field.column_name());
            sql.push_str(" = ?");
        }
        sql.push_str(" WHERE id = ? AND sequence_number = ?");

        let mut query = sqlx::query(&sql)
            .bind(new.modified_by)
            .bind(new.last_modified)
            .bind(new.sequence_number)
            .bind(new.current_version);
        for field in fields {
            query = match field {
                DocumentField::FolderId => query.bind(new.folder_id),
                DocumentField::Title => query.bind(new.title.clone()),
                DocumentField::FileName => query.bind(new.file_name.clone()),
                DocumentField::Description => query.bind(new.description.clone()),
                DocumentField::Url => query.bind(new.url.clone()),
                other => {
                    return Err(AppError::internal(format!(
                        "Column {} is not updatable through the document action",
                        other.column_name()
                    )));
                }
            };
        }
        let result = query
            .bind(old.id)
            .bind(expected_sequence)
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::with_source(
                docvault_core::error::ErrorKind::Database,
                "Failed to update document",
                e,
            ))?;

        if result.rows_affected() == 0 {
            return Err(self.stale_document(tx, old).await);
        }
        Ok(())
    }

    async fn update_version(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        old: &Version,
        new: &Version,
        fields: &[VersionField],
        expected_sequence: i64,
    ) -> AppResult<()> {
        if fields.is_empty() {
            return Ok(());
        }

        let mut sql = String::from("UPDATE versions SET last_modified = ?");
        for field in fields {
            sql.push_str(", ");
            sql.push_str(field.column_name());
            sql.push_str(" = ?");
        }
        sql.push_str(
            " WHERE document_id = ? AND version_number = ? \
             AND (SELECT sequence_number FROM documents WHERE id = ?) = ?",
        );

        let mut query = sqlx::query(&sql).bind(new.last_modified);
        for field in fields {
            query = match field {
                VersionField::Title => query.bind(new.title.clone()),
                VersionField::Description => query.bind(new.description.clone()),
                VersionField::Url => query.bind(new.url.clone()),
                VersionField::FileName => query.bind(new.file_name.clone()),
                VersionField::FileSize => query.bind(new.file_size),
                VersionField::FileMd5 => query.bind(new.file_md5.clone()),
                VersionField::MimeType => query.bind(new.mime_type.clone()),
                VersionField::BlobKey => query.bind(new.blob_key.clone()),
                other => {
                    return Err(AppError::internal(format!(
                        "Column {} is not updatable through the version action",
                        other.column_name()
                    )));
                }
            };
        }
        let result = query
            .bind(old.document_id)
            .bind(old.version_number)
            .bind(old.document_id)
            .bind(expected_sequence)
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::with_source(
                docvault_core::error::ErrorKind::Database,
                "Failed to update version",
                e,
            ))?;

        if result.rows_affected() == 0 {
            let exists: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM versions WHERE document_id = ? AND version_number = ?",
            )
            .bind(old.document_id)
            .bind(old.version_number)
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| AppError::with_source(
                docvault_core::error::ErrorKind::Database,
                "Failed to re-check version",
                e,
            ))?;

            return Err(if exists == 0 {
                AppError::not_found(format!(
                    "Version {} of document {} not found",
                    old.version_number, old.document_id
                ))
            } else {
                AppError::conflict(format!("Document {} has changed", old.document_id))
            });
        }
        Ok(())
    }

    async fn delete_document(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        row: &DocumentMetadata,
        deleted_by: UserId,
        sequence_number: i64,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO document_tombstones \
             (document_id, folder_id, file_name, created_by, deleted_by, sequence_number, deleted_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(row.id)
        .bind(row.folder_id)
        .bind(row.file_name.clone())
        .bind(row.created_by)
        .bind(deleted_by)
        .bind(sequence_number)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::with_source(
            docvault_core::error::ErrorKind::Database,
            "Failed to record document tombstone",
            e,
        ))?;

        // Versions cascade through the foreign key; locks do not.
        sqlx::query("DELETE FROM locks WHERE document_id = ?")
            .bind(row.id)
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::with_source(
                docvault_core::error::ErrorKind::Database,
                "Failed to clear locks",
                e,
            ))?;

        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(row.id)
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::with_source(
                docvault_core::error::ErrorKind::Database,
                "Failed to delete document",
                e,
            ))?;
        Ok(())
    }

    async fn delete_version(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        row: &Version,
        deleted_by: UserId,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO version_tombstones \
             (document_id, version_number, deleted_by, deleted_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(row.document_id)
        .bind(row.version_number)
        .bind(deleted_by)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::with_source(
            docvault_core::error::ErrorKind::Database,
            "Failed to record version tombstone",
            e,
        ))?;

        sqlx::query("DELETE FROM versions WHERE document_id = ? AND version_number = ?")
            .bind(row.document_id)
            .bind(row.version_number)
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::with_source(
                docvault_core::error::ErrorKind::Database,
                "Failed to delete version",
                e,
            ))?;
        Ok(())
    }

    /// Disambiguate a zero-row document update: the row is either gone or
    /// carries a newer sequence number.
    async fn stale_document(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        old: &DocumentMetadata,
    ) -> AppError {
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM documents WHERE id = ?")
            .bind(old.id)
            .fetch_one(&mut **tx)
            .await
            .unwrap_or(0);

        if exists == 0 {
            AppError::not_found(format!("Document {} not found", old.id))
        } else {
            AppError::conflict(format!("Document {} has changed", old.id))
        }
    }
}
