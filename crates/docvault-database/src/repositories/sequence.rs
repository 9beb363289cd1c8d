//! Shared id generator.
//!
//! Every identifier and sequence-clock value in the store comes from one
//! of the generator domains. Allocation is a single upsert-returning
//! statement, safe under concurrent callers without table locks.

use sqlx::SqlitePool;

use docvault_core::error::{AppError, ErrorKind};
use docvault_core::result::AppResult;
use docvault_core::types::DocumentId;

/// Domain for document identifiers.
pub const DOMAIN_DOCUMENT: &str = "document";

/// Domain for the shared mutation-sequence clock. Values are comparable
/// across documents, so delta queries can partition a whole folder
/// against one baseline.
pub const DOMAIN_SEQUENCE: &str = "sequence";

/// Allocates identifiers and sequence-clock values.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    pool: SqlitePool,
}

impl IdGenerator {
    /// Create a new id generator.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Allocate the next value in the given domain.
    pub async fn next(&self, domain: &str) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO sequence_ids (domain, next_id) VALUES (?, 1) \
             ON CONFLICT(domain) DO UPDATE SET next_id = next_id + 1 \
             RETURNING next_id",
        )
        .bind(domain)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to allocate id in domain '{domain}'"),
                e,
            )
        })
    }

    /// Allocate a new document identifier.
    pub async fn next_document_id(&self) -> AppResult<DocumentId> {
        self.next(DOMAIN_DOCUMENT).await.map(DocumentId::from_raw)
    }

    /// Allocate the next mutation-sequence value.
    pub async fn next_sequence(&self) -> AppResult<i64> {
        self.next(DOMAIN_SEQUENCE).await
    }
}
