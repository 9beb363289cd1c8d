//! Version repository — queries over the versions collection.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use docvault_core::error::{AppError, ErrorKind};
use docvault_core::result::AppResult;
use docvault_core::traits::blob::BlobKey;
use docvault_core::types::sorting::SortOrder;
use docvault_core::types::{DocumentId, UserId};
use docvault_entity::document::field::VersionField;
use docvault_entity::document::version::Version;

/// Repository for version row queries.
#[derive(Debug, Clone)]
pub struct VersionRepository {
    pool: SqlitePool,
}

impl VersionRepository {
    /// Create a new version repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find a specific version of a document.
    pub async fn find(
        &self,
        document_id: DocumentId,
        version_number: i64,
    ) -> AppResult<Option<Version>> {
        sqlx::query_as::<_, Version>(
            "SELECT * FROM versions WHERE document_id = ? AND version_number = ?",
        )
        .bind(document_id)
        .bind(version_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find version", e))
    }

    /// List versions of a document with column projection and optional
    /// sort (default: newest first).
    pub async fn find_all(
        &self,
        document_id: DocumentId,
        columns: &[VersionField],
        sort: Option<SortOrder<VersionField>>,
    ) -> AppResult<Vec<Version>> {
        let (select_list, selected) = projection(columns);

        let mut sql = format!("SELECT {select_list} FROM versions WHERE document_id = ?");
        match sort {
            Some(order) => {
                sql.push_str(&format!(
                    " ORDER BY {} {}",
                    order.field.column_name(),
                    order.direction.as_sql()
                ));
            }
            None => sql.push_str(" ORDER BY version_number DESC"),
        }

        let rows = sqlx::query(&sql)
            .bind(document_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list versions", e))?;

        rows.iter().map(|row| from_projected_row(row, &selected)).collect()
    }

    /// The live version numbers of a document, ascending.
    pub async fn version_numbers(&self, document_id: DocumentId) -> AppResult<Vec<i64>> {
        sqlx::query_scalar::<_, i64>(
            "SELECT version_number FROM versions WHERE document_id = ? ORDER BY version_number ASC",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list version numbers", e)
        })
    }

    /// The highest version number ever used for a document, including
    /// deleted versions. Version numbers are never reused, so new
    /// content always gets `highest + 1`.
    pub async fn max_version_number(&self, document_id: DocumentId) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(MAX(version_number), 0) FROM (\
                 SELECT version_number FROM versions WHERE document_id = ?1 \
                 UNION ALL \
                 SELECT version_number FROM version_tombstones WHERE document_id = ?1\
             )",
        )
        .bind(document_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to read max version number", e)
        })
    }

    /// Count live versions of a document.
    pub async fn count(&self, document_id: DocumentId) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM versions WHERE document_id = ?")
            .bind(document_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count versions", e))
    }

    /// All blob keys referenced by a document's versions.
    pub async fn blob_keys(&self, document_id: DocumentId) -> AppResult<Vec<BlobKey>> {
        sqlx::query_scalar::<_, BlobKey>(
            "SELECT blob_key FROM versions WHERE document_id = ? AND blob_key IS NOT NULL",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list blob keys", e))
    }
}

/// Build the SELECT list for a projection. An empty request selects all
/// columns; otherwise the identity columns are always included.
fn projection(columns: &[VersionField]) -> (String, Vec<VersionField>) {
    if columns.is_empty() {
        let all = VersionField::all().to_vec();
        let list = all.iter().map(|c| c.column_name()).collect::<Vec<_>>().join(", ");
        return (list, all);
    }

    let mut selected = vec![VersionField::DocumentId, VersionField::VersionNumber];
    for column in columns {
        if !selected.contains(column) {
            selected.push(*column);
        }
    }
    let list = selected.iter().map(|c| c.column_name()).collect::<Vec<_>>().join(", ");
    (list, selected)
}

/// Map a projected row into a full version struct, defaulting the
/// columns that were not selected.
fn from_projected_row(row: &SqliteRow, selected: &[VersionField]) -> AppResult<Version> {
    let mut version = Version {
        document_id: DocumentId::from_raw(0),
        version_number: 0,
        title: None,
        description: None,
        url: None,
        file_name: None,
        file_size: 0,
        file_md5: None,
        mime_type: None,
        blob_key: None,
        created_by: UserId::from_raw(0),
        creation_date: chrono::DateTime::UNIX_EPOCH,
        last_modified: chrono::DateTime::UNIX_EPOCH,
    };

    for field in selected {
        let name = field.column_name();
        let result = match field {
            VersionField::DocumentId => row.try_get(name).map(|v| version.document_id = v),
            VersionField::VersionNumber => row.try_get(name).map(|v| version.version_number = v),
            VersionField::Title => row.try_get(name).map(|v| version.title = v),
            VersionField::Description => row.try_get(name).map(|v| version.description = v),
            VersionField::Url => row.try_get(name).map(|v| version.url = v),
            VersionField::FileName => row.try_get(name).map(|v| version.file_name = v),
            VersionField::FileSize => row.try_get(name).map(|v| version.file_size = v),
            VersionField::FileMd5 => row.try_get(name).map(|v| version.file_md5 = v),
            VersionField::MimeType => row.try_get(name).map(|v| version.mime_type = v),
            VersionField::BlobKey => row.try_get(name).map(|v| version.blob_key = v),
            VersionField::CreatedBy => row.try_get(name).map(|v| version.created_by = v),
            VersionField::CreationDate => row.try_get(name).map(|v| version.creation_date = v),
            VersionField::LastModified => row.try_get(name).map(|v| version.last_modified = v),
        };
        result.map_err(|e| {
            AppError::with_source(ErrorKind::Database, format!("Failed to read column {name}"), e)
        })?;
    }

    Ok(version)
}
