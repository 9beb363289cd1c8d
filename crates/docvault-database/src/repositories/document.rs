//! Document repository — queries over the documents collection.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use docvault_core::error::{AppError, ErrorKind};
use docvault_core::result::AppResult;
use docvault_core::types::{DocumentId, FolderId, UserId};
use docvault_entity::document::field::DocumentField;
use docvault_entity::document::model::DocumentMetadata;
use docvault_core::types::sorting::SortOrder;

/// Repository for document row queries.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    pool: SqlitePool,
}

impl DocumentRepository {
    /// Create a new document repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find a document by ID.
    pub async fn find_by_id(&self, id: DocumentId) -> AppResult<Option<DocumentMetadata>> {
        sqlx::query_as::<_, DocumentMetadata>("SELECT * FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find document", e))
    }

    /// Find several documents by ID. Missing ids are silently absent from
    /// the result.
    pub async fn find_by_ids(&self, ids: &[DocumentId]) -> AppResult<Vec<DocumentMetadata>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT * FROM documents WHERE id IN ({placeholders})");

        let mut query = sqlx::query_as::<_, DocumentMetadata>(&sql);
        for id in ids {
            query = query.bind(*id);
        }

        query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find documents", e))
    }

    /// List documents in a folder with column projection, optional sort,
    /// and optional owner scoping (for callers holding read-own-only).
    pub async fn find_by_folder(
        &self,
        folder_id: FolderId,
        columns: &[DocumentField],
        sort: Option<SortOrder<DocumentField>>,
        owner_scope: Option<UserId>,
    ) -> AppResult<Vec<DocumentMetadata>> {
        let (select_list, selected) = projection(columns);

        let mut sql = format!("SELECT {select_list} FROM documents WHERE folder_id = ?");
        if owner_scope.is_some() {
            sql.push_str(" AND created_by = ?");
        }
        match sort {
            Some(order) => {
                sql.push_str(&format!(
                    " ORDER BY {} {}",
                    order.field.column_name(),
                    order.direction.as_sql()
                ));
            }
            None => sql.push_str(" ORDER BY id ASC"),
        }

        let mut query = sqlx::query(&sql).bind(folder_id);
        if let Some(owner) = owner_scope {
            query = query.bind(owner);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list documents", e))?;

        rows.iter().map(|row| from_projected_row(row, &selected)).collect()
    }

    /// Find a non-deleted document in the folder carrying the given
    /// non-empty file name, excluding `exclude` (the document being
    /// saved). Empty and missing names are exempt from uniqueness.
    pub async fn find_duplicate_file_name(
        &self,
        folder_id: FolderId,
        file_name: &str,
        exclude: Option<DocumentId>,
    ) -> AppResult<Option<DocumentId>> {
        if file_name.is_empty() {
            return Ok(None);
        }

        let result = match exclude {
            Some(id) => {
                sqlx::query_scalar::<_, DocumentId>(
                    "SELECT id FROM documents WHERE folder_id = ? AND file_name = ? AND id != ? LIMIT 1",
                )
                .bind(folder_id)
                .bind(file_name)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
            }
            None => {
                sqlx::query_scalar::<_, DocumentId>(
                    "SELECT id FROM documents WHERE folder_id = ? AND file_name = ? LIMIT 1",
                )
                .bind(folder_id)
                .bind(file_name)
                .fetch_optional(&self.pool)
                .await
            }
        };

        result.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to check file name", e)
        })
    }

    /// Count documents in a folder, optionally scoped to one owner's
    /// items.
    pub async fn count_by_folder(
        &self,
        folder_id: FolderId,
        owner_scope: Option<UserId>,
    ) -> AppResult<i64> {
        let result = match owner_scope {
            Some(owner) => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM documents WHERE folder_id = ? AND created_by = ?",
                )
                .bind(folder_id)
                .bind(owner)
                .fetch_one(&self.pool)
                .await
            }
            None => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM documents WHERE folder_id = ?")
                    .bind(folder_id)
                    .fetch_one(&self.pool)
                    .await
            }
        };
        result.map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count documents", e))
    }

    /// Whether the folder holds no live documents. Tombstones do not
    /// count towards occupancy.
    pub async fn is_folder_empty(&self, folder_id: FolderId) -> AppResult<bool> {
        self.count_by_folder(folder_id, None).await.map(|count| count == 0)
    }

    /// Whether the folder holds live documents created by someone other
    /// than `user`.
    pub async fn has_foreign_objects(&self, folder_id: FolderId, user: UserId) -> AppResult<bool> {
        sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT 1 FROM documents WHERE folder_id = ? AND created_by != ?)",
        )
        .bind(folder_id)
        .bind(user)
        .fetch_one(&self.pool)
        .await
        .map(|v| v != 0)
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to check foreign objects", e)
        })
    }

    /// Documents in the folder mutated after the given sequence baseline,
    /// oldest change first.
    pub async fn find_changed_since(
        &self,
        folder_id: FolderId,
        since: i64,
        owner_scope: Option<UserId>,
    ) -> AppResult<Vec<DocumentMetadata>> {
        let result = match owner_scope {
            Some(owner) => {
                sqlx::query_as::<_, DocumentMetadata>(
                    "SELECT * FROM documents \
                     WHERE folder_id = ? AND sequence_number > ? AND created_by = ? \
                     ORDER BY sequence_number ASC",
                )
                .bind(folder_id)
                .bind(since)
                .bind(owner)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, DocumentMetadata>(
                    "SELECT * FROM documents \
                     WHERE folder_id = ? AND sequence_number > ? \
                     ORDER BY sequence_number ASC",
                )
                .bind(folder_id)
                .bind(since)
                .fetch_all(&self.pool)
                .await
            }
        };

        result.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to scan folder changes", e)
        })
    }

    /// The stored sequence number of a document, if it exists.
    pub async fn sequence_number_of(&self, id: DocumentId) -> AppResult<Option<i64>> {
        sqlx::query_scalar::<_, i64>("SELECT sequence_number FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to read sequence number", e)
            })
    }
}

/// Build the SELECT list for a projection. An empty request selects all
/// columns; otherwise the identity column is always included.
fn projection(columns: &[DocumentField]) -> (String, Vec<DocumentField>) {
    if columns.is_empty() {
        let all = DocumentField::all().to_vec();
        let list = all.iter().map(|c| c.column_name()).collect::<Vec<_>>().join(", ");
        return (list, all);
    }

    let mut selected = vec![DocumentField::Id];
    for column in columns {
        if !selected.contains(column) {
            selected.push(*column);
        }
    }
    let list = selected.iter().map(|c| c.column_name()).collect::<Vec<_>>().join(", ");
    (list, selected)
}

/// Map a projected row into a full metadata struct, defaulting the
/// columns that were not selected.
fn from_projected_row(row: &SqliteRow, selected: &[DocumentField]) -> AppResult<DocumentMetadata> {
    let mut doc = DocumentMetadata {
        id: DocumentId::from_raw(0),
        folder_id: FolderId::from_raw(0),
        title: None,
        file_name: None,
        description: None,
        url: None,
        created_by: UserId::from_raw(0),
        modified_by: UserId::from_raw(0),
        creation_date: chrono::DateTime::UNIX_EPOCH,
        last_modified: chrono::DateTime::UNIX_EPOCH,
        sequence_number: 0,
        created_sequence: 0,
        current_version: 0,
    };

    for field in selected {
        let name = field.column_name();
        let result = match field {
            DocumentField::Id => row.try_get(name).map(|v| doc.id = v),
            DocumentField::FolderId => row.try_get(name).map(|v| doc.folder_id = v),
            DocumentField::Title => row.try_get(name).map(|v| doc.title = v),
            DocumentField::FileName => row.try_get(name).map(|v| doc.file_name = v),
            DocumentField::Description => row.try_get(name).map(|v| doc.description = v),
            DocumentField::Url => row.try_get(name).map(|v| doc.url = v),
            DocumentField::CreatedBy => row.try_get(name).map(|v| doc.created_by = v),
            DocumentField::ModifiedBy => row.try_get(name).map(|v| doc.modified_by = v),
            DocumentField::CreationDate => row.try_get(name).map(|v| doc.creation_date = v),
            DocumentField::LastModified => row.try_get(name).map(|v| doc.last_modified = v),
            DocumentField::SequenceNumber => row.try_get(name).map(|v| doc.sequence_number = v),
            DocumentField::CurrentVersion => row.try_get(name).map(|v| doc.current_version = v),
        };
        result.map_err(|e| {
            AppError::with_source(ErrorKind::Database, format!("Failed to read column {name}"), e)
        })?;
    }

    Ok(doc)
}
