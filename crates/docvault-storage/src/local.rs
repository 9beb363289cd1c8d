//! Local filesystem blob store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::debug;
use uuid::Uuid;

use docvault_core::config::StorageConfig;
use docvault_core::error::{AppError, ErrorKind};
use docvault_core::result::AppResult;
use docvault_core::traits::blob::{BlobKey, BlobStore, ByteStream};
use docvault_core::types::UserId;

use crate::quota::{QuotaLedger, QuotaUsage};

/// Subdirectory for staged writes that have not passed the quota gate.
const STAGING_DIR: &str = "tmp";

/// Local filesystem blob store with per-owner quota accounting.
///
/// Blobs live at `{root}/{owner}/{uuid}`. Writes are staged under
/// `{root}/tmp/` and renamed into place only after the quota check and a
/// complete write, so a rejected or failed put never leaves a durable
/// partial blob behind.
#[derive(Debug)]
pub struct LocalBlobStore {
    /// Root directory for all stored blobs.
    root: PathBuf,
    /// Per-owner usage accounting.
    ledger: QuotaLedger,
}

impl LocalBlobStore {
    /// Create a new local blob store from configuration.
    pub async fn new(config: &StorageConfig) -> AppResult<Self> {
        let root = PathBuf::from(&config.root_path);
        fs::create_dir_all(root.join(STAGING_DIR)).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::StoreUnavailable,
                format!("Failed to create blob store root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self {
            root,
            ledger: QuotaLedger::new(config.default_quota_bytes),
        })
    }

    /// Current quota snapshot for an owner.
    pub async fn quota_usage(&self, owner: UserId) -> AppResult<QuotaUsage> {
        self.ensure_usage_loaded(owner).await?;
        Ok(self.ledger.usage(owner).await)
    }

    /// Resolve a key to its path under the root. Keys are store-generated;
    /// anything traversal-shaped is rejected outright.
    fn blob_path(&self, key: &BlobKey) -> AppResult<PathBuf> {
        let raw = key.as_str();
        if raw.is_empty() || raw.split('/').any(|part| part.is_empty() || part == "..") {
            return Err(AppError::validation(format!("Malformed blob key: {raw}")));
        }
        Ok(self.root.join(raw))
    }

    /// The owner encoded in a key's leading path segment.
    fn owner_of(key: &BlobKey) -> Option<UserId> {
        key.as_str()
            .split('/')
            .next()
            .and_then(|part| part.parse::<i64>().ok())
            .map(UserId::from_raw)
    }

    /// Lazily initialise the owner's usage from a directory scan.
    async fn ensure_usage_loaded(&self, owner: UserId) -> AppResult<()> {
        if self.ledger.is_initialized(owner).await {
            return Ok(());
        }

        let dir = self.root.join(owner.into_raw().to_string());
        let mut total = 0u64;
        if dir.is_dir() {
            let mut entries = fs::read_dir(&dir).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::StoreUnavailable,
                    format!("Failed to scan blob directory: {}", dir.display()),
                    e,
                )
            })?;
            while let Some(entry) = entries.next_entry().await.map_err(|e| {
                AppError::with_source(ErrorKind::StoreUnavailable, "Failed to read blob entry", e)
            })? {
                let meta = entry.metadata().await.map_err(|e| {
                    AppError::with_source(
                        ErrorKind::StoreUnavailable,
                        "Failed to stat blob entry",
                        e,
                    )
                })?;
                if meta.is_file() {
                    total += meta.len();
                }
            }
        }

        self.ledger.initialize(owner, total).await;
        Ok(())
    }

    /// Ensure the parent directory of a path exists.
    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::StoreUnavailable,
                    format!("Failed to create directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    /// Move a fully written staging file into its final location.
    async fn promote(&self, staged: &Path, key: &BlobKey) -> AppResult<()> {
        let final_path = self.blob_path(key)?;
        self.ensure_parent(&final_path).await?;
        fs::rename(staged, &final_path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::StoreUnavailable,
                format!("Failed to finalize blob {key}"),
                e,
            )
        })
    }

    fn new_key(owner: UserId) -> BlobKey {
        BlobKey(format!("{}/{}", owner.into_raw(), Uuid::new_v4()))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn health_check(&self) -> AppResult<bool> {
        Ok(self.root.exists() && self.root.is_dir())
    }

    async fn put(
        &self,
        owner: UserId,
        mut stream: ByteStream,
        size_hint: Option<u64>,
    ) -> AppResult<BlobKey> {
        self.ensure_usage_loaded(owner).await?;

        // Reserve the hinted size up front so an oversized request fails
        // before a single byte is staged.
        let hint = size_hint.unwrap_or(0);
        self.ledger.try_reserve(owner, hint).await?;
        let mut reserved = hint;

        let key = Self::new_key(owner);
        let staged = self
            .root
            .join(STAGING_DIR)
            .join(Uuid::new_v4().to_string());

        let result = async {
            let mut file = fs::File::create(&staged).await.map_err(|e| {
                AppError::with_source(ErrorKind::StoreUnavailable, "Failed to stage blob", e)
            })?;

            let mut total = 0u64;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| {
                    AppError::with_source(ErrorKind::StoreUnavailable, "Stream read error", e)
                })?;
                total += chunk.len() as u64;
                file.write_all(&chunk).await.map_err(|e| {
                    AppError::with_source(ErrorKind::StoreUnavailable, "Failed to write chunk", e)
                })?;
            }
            file.flush().await.map_err(|e| {
                AppError::with_source(ErrorKind::StoreUnavailable, "Failed to flush blob", e)
            })?;

            // The stream may have been larger than the hint; settle the
            // difference before the blob becomes durable.
            if total > hint {
                self.ledger.try_reserve(owner, total - hint).await?;
            } else {
                self.ledger.release(owner, hint - total).await;
            }
            reserved = total;

            self.promote(&staged, &key).await?;
            Ok(total)
        }
        .await;

        match result {
            Ok(total) => {
                debug!(key = %key, bytes = total, "Stored blob");
                Ok(key)
            }
            Err(err) => {
                let _ = fs::remove_file(&staged).await;
                self.ledger.release(owner, reserved).await;
                Err(err)
            }
        }
    }

    async fn put_bytes(&self, owner: UserId, data: Bytes) -> AppResult<BlobKey> {
        self.ensure_usage_loaded(owner).await?;

        let size = data.len() as u64;
        self.ledger.try_reserve(owner, size).await?;

        let key = Self::new_key(owner);
        let staged = self
            .root
            .join(STAGING_DIR)
            .join(Uuid::new_v4().to_string());

        let result = async {
            fs::write(&staged, &data).await.map_err(|e| {
                AppError::with_source(ErrorKind::StoreUnavailable, "Failed to stage blob", e)
            })?;
            self.promote(&staged, &key).await
        }
        .await;

        match result {
            Ok(()) => {
                debug!(key = %key, bytes = size, "Stored blob");
                Ok(key)
            }
            Err(err) => {
                let _ = fs::remove_file(&staged).await;
                self.ledger.release(owner, size).await;
                Err(err)
            }
        }
    }

    async fn get(&self, key: &BlobKey) -> AppResult<ByteStream> {
        let path = self.blob_path(key)?;
        let file = fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("Blob not found: {key}"))
            } else {
                AppError::with_source(
                    ErrorKind::StoreUnavailable,
                    format!("Failed to open blob: {key}"),
                    e,
                )
            }
        })?;

        let stream = ReaderStream::new(file);
        Ok(Box::pin(stream.map(|r| r.map(|b| b.into()))))
    }

    async fn get_bytes(&self, key: &BlobKey) -> AppResult<Bytes> {
        let path = self.blob_path(key)?;
        let data = fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("Blob not found: {key}"))
            } else {
                AppError::with_source(
                    ErrorKind::StoreUnavailable,
                    format!("Failed to read blob: {key}"),
                    e,
                )
            }
        })?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, key: &BlobKey) -> AppResult<()> {
        let path = self.blob_path(key)?;
        let size = match fs::metadata(&path).await {
            Ok(meta) => meta.len(),
            // Deleting a non-existent key is not an error.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::StoreUnavailable,
                    format!("Failed to stat blob: {key}"),
                    e,
                ));
            }
        };

        fs::remove_file(&path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::StoreUnavailable,
                format!("Failed to delete blob: {key}"),
                e,
            )
        })?;

        if let Some(owner) = Self::owner_of(key) {
            if self.ledger.is_initialized(owner).await {
                self.ledger.release(owner, size).await;
            }
        }

        debug!(key = %key, bytes = size, "Deleted blob");
        Ok(())
    }

    async fn size_of(&self, key: &BlobKey) -> AppResult<u64> {
        let path = self.blob_path(key)?;
        let meta = fs::metadata(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("Blob not found: {key}"))
            } else {
                AppError::with_source(
                    ErrorKind::StoreUnavailable,
                    format!("Failed to stat blob: {key}"),
                    e,
                )
            }
        })?;
        Ok(meta.len())
    }
}
