//! Blob store trait for opaque, quota-accounted byte payloads.

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;
use crate::types::UserId;

/// Opaque identifier returned by the blob store for a stored payload.
///
/// Keys are generated by the store on `put` and are meaningless to
/// callers; the metadata store persists them on version rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobKey(pub String);

impl BlobKey {
    /// Return the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for BlobKey {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

#[cfg(feature = "sqlx")]
impl sqlx::Type<sqlx::Sqlite> for BlobKey {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

#[cfg(feature = "sqlx")]
impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for BlobKey {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<'q, sqlx::Sqlite>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(feature = "sqlx")]
impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for BlobKey {
    fn decode(
        value: <sqlx::Sqlite as sqlx::Database>::ValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        <String as sqlx::Decode<'r, sqlx::Sqlite>>::decode(value).map(Self)
    }
}

/// A byte stream type used for reading and writing blob contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Trait for the quota-accounted blob store.
///
/// The store does not interpret content; size and checksum bookkeeping is
/// the caller's responsibility. `put` must reject writes that would
/// exceed the owning user's configured quota before any partial write is
/// made durable. The trait is defined here in `docvault-core` and
/// implemented in `docvault-storage`.
#[async_trait]
pub trait BlobStore: Send + Sync + fmt::Debug + 'static {
    /// Check whether the store is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Store a streamed payload on behalf of `owner` and return the
    /// generated key. `size_hint` lets the store pre-check the quota;
    /// the actual streamed size is enforced as well.
    async fn put(
        &self,
        owner: UserId,
        stream: ByteStream,
        size_hint: Option<u64>,
    ) -> AppResult<BlobKey>;

    /// Store an in-memory payload on behalf of `owner` and return the
    /// generated key.
    async fn put_bytes(&self, owner: UserId, data: Bytes) -> AppResult<BlobKey>;

    /// Read a blob as a byte stream.
    async fn get(&self, key: &BlobKey) -> AppResult<ByteStream>;

    /// Read a blob into memory as a complete byte vector.
    async fn get_bytes(&self, key: &BlobKey) -> AppResult<Bytes>;

    /// Delete a blob. Deleting a non-existent key is not an error.
    async fn delete(&self, key: &BlobKey) -> AppResult<()>;

    /// Return the stored size of a blob in bytes.
    async fn size_of(&self, key: &BlobKey) -> AppResult<u64>;
}
