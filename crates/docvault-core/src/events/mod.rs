//! Domain events emitted by DocVault operations.
//!
//! Events are published through an [`EventSink`](crate::traits::events::EventSink)
//! after the metadata transaction commits. Consumers are external
//! (audit loggers, synchronization listeners, push channels); delivery is
//! at-most-once best-effort and never part of the consistency contract.

pub mod document;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::UserId;

pub use document::DocumentEvent;

/// Wrapper for all domain events with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The user who caused the event.
    pub actor: UserId,
    /// The event payload.
    pub payload: DocumentEvent,
}

impl DomainEvent {
    /// Create a new domain event.
    pub fn new(actor: UserId, payload: DocumentEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor,
            payload,
        }
    }
}
