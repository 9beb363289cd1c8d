//! Event sink trait for fire-and-forget change notification.

use async_trait::async_trait;

use crate::events::DomainEvent;
use crate::result::AppResult;

/// Receiver for domain events.
///
/// Implementations deliver events to external listeners (audit, sync,
/// push). Publishing happens after the metadata transaction commits;
/// errors returned from `publish` are logged by the caller and never
/// propagate into the triggering operation.
#[async_trait]
pub trait EventSink: Send + Sync + std::fmt::Debug + 'static {
    /// Publish a single event.
    async fn publish(&self, event: DomainEvent) -> AppResult<()>;
}

/// An [`EventSink`] that logs events at debug level and discards them.
#[derive(Debug, Clone, Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn publish(&self, event: DomainEvent) -> AppResult<()> {
        tracing::debug!(event_id = %event.id, actor = %event.actor, "Event published");
        Ok(())
    }
}
