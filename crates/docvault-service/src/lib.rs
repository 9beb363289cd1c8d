//! # docvault-service
//!
//! Business logic for DocVault: the permission gate, the advisory lock
//! manager, the change notifier, and the document facade that
//! orchestrates metadata and blob writes under one transaction boundary.

pub mod context;
pub mod document;
pub mod lock;
pub mod notify;
pub mod permission;
pub mod store;

pub use context::RequestContext;
pub use document::removal::RemovalService;
pub use document::service::DocumentService;
pub use lock::manager::{LockManager, INFINITE_TIMEOUT};
pub use notify::ChangeNotifier;
pub use permission::gate::PermissionGate;
pub use permission::resolver::{RightsResolver, StaticRightsResolver};
pub use store::DocumentStore;
