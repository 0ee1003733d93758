//! Change-event publishing.
//!
//! One message is published per successfully persisted update. Publishing
//! is best-effort: persistence is the source of truth, so a failed or
//! unconfirmed publish is logged and counted but never surfaced to the
//! request that triggered it.

use async_trait::async_trait;

use crate::models::ContentItem;
use crate::presenter::PrivateItemPresenter;

mod amqp;

pub use amqp::AmqpPublisher;

/// Ephemeral change event, derived from a persisted item.
#[derive(Debug, Clone)]
pub struct PublishEvent {
    /// Topic routing key, `<format>.<update_type>`.
    pub routing_key: String,

    /// The item's private representation.
    pub payload: serde_json::Value,
}

impl PublishEvent {
    /// Build the event for a just-persisted item.
    pub fn for_item(item: &ContentItem) -> Self {
        Self {
            routing_key: format!("{}.{}", item.format, item.update_type),
            payload: PrivateItemPresenter::new(item).to_json(),
        }
    }
}

/// Broadcasts change events to downstream consumers.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publish one event. Infallible from the caller's point of view:
    /// delivery problems are absorbed and surfaced to observability only.
    async fn send(&self, event: PublishEvent);
}

/// Publisher that skips all broker I/O.
///
/// Selected by configuration; indistinguishable from a successful publish
/// to the caller.
#[derive(Debug, Default)]
pub struct NoopPublisher;

#[async_trait]
impl MessagePublisher for NoopPublisher {
    async fn send(&self, _event: PublishEvent) {}
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn routing_key_combines_format_and_update_type() {
        let item = ContentItem::transient(
            "/vat-rates",
            &serde_json::json!({
                "format": "answer",
                "update_type": "minor",
                "publishing_app": "publisher",
            }),
        );
        let event = PublishEvent::for_item(&item);
        assert_eq!(event.routing_key, "answer.minor");
    }

    #[test]
    fn payload_is_the_private_representation() {
        let item = ContentItem::transient(
            "/vat-rates",
            &serde_json::json!({
                "format": "answer",
                "update_type": "major",
                "publishing_app": "publisher",
                "details": { "body": "text" },
            }),
        );
        let event = PublishEvent::for_item(&item);
        assert_eq!(event.payload["base_path"], "/vat-rates");
        assert_eq!(event.payload["publishing_app"], "publisher");
        assert!(event.payload.get("errors").is_none());
    }

    #[tokio::test]
    async fn noop_publisher_accepts_events() {
        let publisher = NoopPublisher;
        let item = ContentItem::transient(
            "/vat-rates",
            &serde_json::json!({
                "format": "answer",
                "update_type": "major",
                "publishing_app": "publisher",
            }),
        );
        publisher.send(PublishEvent::for_item(&item)).await;
    }
}
