//! Per-owner storage quota accounting.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use docvault_core::error::AppError;
use docvault_core::result::AppResult;
use docvault_core::types::UserId;

/// Quota snapshot for one owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaUsage {
    /// Total quota in bytes (None = unlimited).
    pub total_bytes: Option<u64>,
    /// Currently used bytes.
    pub used_bytes: u64,
}

impl QuotaUsage {
    /// Create a quota snapshot from total and used values.
    pub fn new(total_bytes: Option<u64>, used_bytes: u64) -> Self {
        Self {
            total_bytes,
            used_bytes,
        }
    }

    /// Remaining bytes (None if unlimited).
    pub fn available_bytes(&self) -> Option<u64> {
        self.total_bytes.map(|total| total.saturating_sub(self.used_bytes))
    }

    /// Check if the quota is already exhausted.
    pub fn is_exceeded(&self) -> bool {
        match self.total_bytes {
            Some(total) => self.used_bytes >= total,
            None => false,
        }
    }

    /// Check if adding the given number of bytes would exceed the quota.
    pub fn would_exceed(&self, additional_bytes: u64) -> bool {
        match self.total_bytes {
            Some(total) => self.used_bytes + additional_bytes > total,
            None => false,
        }
    }
}

/// Tracks used bytes per owner and enforces the configured limit.
///
/// Usage is initialised lazily by the store (a one-time directory scan
/// per owner) and kept current on every successful put and delete.
/// Reservations happen under one lock so two concurrent writers cannot
/// both squeeze into the last remaining bytes.
#[derive(Debug)]
pub struct QuotaLedger {
    limit: Option<u64>,
    used: Mutex<HashMap<i64, u64>>,
}

impl QuotaLedger {
    /// Create a ledger with the given per-owner limit (None = unlimited).
    pub fn new(limit: Option<u64>) -> Self {
        Self {
            limit,
            used: Mutex::new(HashMap::new()),
        }
    }

    /// The configured per-owner limit.
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Whether usage for this owner has been initialised.
    pub async fn is_initialized(&self, owner: UserId) -> bool {
        self.used.lock().await.contains_key(&owner.into_raw())
    }

    /// Record the scanned usage for an owner, if not already known.
    pub async fn initialize(&self, owner: UserId, used_bytes: u64) {
        self.used
            .lock()
            .await
            .entry(owner.into_raw())
            .or_insert(used_bytes);
    }

    /// Reserve `bytes` against the owner's quota, failing with
    /// `QuotaExceeded` and reserving nothing when the limit would be
    /// crossed.
    pub async fn try_reserve(&self, owner: UserId, bytes: u64) -> AppResult<()> {
        let mut used = self.used.lock().await;
        let entry = used.entry(owner.into_raw()).or_insert(0);
        let usage = QuotaUsage::new(self.limit, *entry);
        if usage.would_exceed(bytes) {
            return Err(AppError::quota_exceeded(format!(
                "Storing {bytes} bytes would exceed the quota of {} bytes for user {owner} ({} in use)",
                self.limit.unwrap_or(0),
                *entry,
            )));
        }
        *entry += bytes;
        Ok(())
    }

    /// Release a previous reservation (failed write or deleted blob).
    pub async fn release(&self, owner: UserId, bytes: u64) {
        let mut used = self.used.lock().await;
        if let Some(entry) = used.get_mut(&owner.into_raw()) {
            *entry = entry.saturating_sub(bytes);
        }
    }

    /// Current usage snapshot for an owner.
    pub async fn usage(&self, owner: UserId) -> QuotaUsage {
        let used = self.used.lock().await;
        QuotaUsage::new(self.limit, used.get(&owner.into_raw()).copied().unwrap_or(0))
    }
}
