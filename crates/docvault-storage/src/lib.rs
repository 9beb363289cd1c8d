//! # docvault-storage
//!
//! Blob store implementation for DocVault: a flat, quota-accounted
//! key/value byte store on the local filesystem. Keys are generated by
//! the store; content is never interpreted.

pub mod local;
pub mod quota;

pub use local::LocalBlobStore;
pub use quota::{QuotaLedger, QuotaUsage};
