//! # docvault-entity
//!
//! Domain entity models for DocVault: document and version rows,
//! advisory locks, tombstones, typed column enums, and effective-rights
//! value objects.

pub mod document;
pub mod rights;

pub use document::delta::DocumentDelta;
pub use document::field::{DocumentField, VersionField};
pub use document::lock::{Lock, LockScope, LockType};
pub use document::model::{DocumentInput, DocumentMetadata};
pub use document::tombstone::{DocumentTombstone, VersionTombstone};
pub use document::version::Version;
pub use rights::{AccessScope, RightsSet};
