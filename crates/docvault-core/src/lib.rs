//! # docvault-core
//!
//! Core crate for DocVault. Contains the unified error system, typed
//! identifiers, configuration schemas, domain events, and the blob store
//! contract.
//!
//! This crate has **no** internal dependencies on other DocVault crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
