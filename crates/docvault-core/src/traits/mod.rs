//! Collaborator traits implemented outside this crate.

pub mod blob;
pub mod events;

pub use blob::{BlobKey, BlobStore, ByteStream};
pub use events::EventSink;
