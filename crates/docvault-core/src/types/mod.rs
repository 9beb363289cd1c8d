//! Shared value types: typed identifiers and sorting.

pub mod id;
pub mod sorting;

pub use id::{DocumentId, FolderId, UserId};
pub use sorting::{SortDirection, SortOrder};
