//! Change notifier — fire-and-continue event delivery.

use std::sync::Arc;

use tracing::warn;

use docvault_core::events::{DocumentEvent, DomainEvent};
use docvault_core::traits::events::EventSink;
use docvault_core::types::{DocumentId, FolderId, UserId};
use docvault_entity::document::model::DocumentMetadata;

/// Publishes create/modify/delete events to an external sink.
///
/// Invoked after the metadata transaction commits. Failures inside the
/// sink are caught and logged; they never roll back or fail the
/// triggering operation.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sink: Arc<dyn EventSink>,
}

impl ChangeNotifier {
    /// Create a notifier over the given sink.
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Notify listeners that a document was created.
    pub async fn created(&self, actor: UserId, document: &DocumentMetadata) {
        self.publish(
            actor,
            DocumentEvent::Created {
                document_id: document.id,
                folder_id: document.folder_id,
                file_name: document.file_name.clone(),
            },
        )
        .await;
    }

    /// Notify listeners that a document was modified.
    pub async fn modified(&self, actor: UserId, document: &DocumentMetadata) {
        self.publish(
            actor,
            DocumentEvent::Modified {
                document_id: document.id,
                folder_id: document.folder_id,
                current_version: document.current_version,
            },
        )
        .await;
    }

    /// Notify listeners that a document was deleted.
    pub async fn deleted(
        &self,
        actor: UserId,
        document_id: DocumentId,
        folder_id: FolderId,
        file_name: Option<String>,
    ) {
        self.publish(
            actor,
            DocumentEvent::Deleted {
                document_id,
                folder_id,
                file_name,
            },
        )
        .await;
    }

    async fn publish(&self, actor: UserId, payload: DocumentEvent) {
        let event = DomainEvent::new(actor, payload);
        if let Err(err) = self.sink.publish(event).await {
            warn!(error = %err, "Change notification failed; continuing");
        }
    }
}
