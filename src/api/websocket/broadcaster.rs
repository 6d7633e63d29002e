//! WebSocket event broadcaster
//!
//! The CRUD layer calls [`Publisher::publish`] after each committed mutation.
//! The in-memory [`EventBroadcaster`] routes the event to its topic, takes a
//! snapshot of the subscribed connections and queues the serialized frame on
//! each one without waiting.
//!
//! # Delivery
//!
//! Best effort, at most once. A connection whose queue is full or closed is
//! dropped from the registry after the sweep; the remaining connections in the
//! snapshot still receive the frame. Nothing is retried or replayed, so a
//! connection that subscribes after a publish never sees that event.
//!
//! Each connection has one FIFO queue drained by a single writer, so events
//! published one after another to a topic reach every subscriber in order.

use std::sync::Arc;

use super::events::DomainEvent;
use super::registry::{ConnectionRegistry, SendFailure};
use super::router::route;

/// Outcome of one sweep over a topic's subscribers
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub topic: String,
    /// Connections the frame was queued on
    pub delivered: usize,
    /// Connections that failed and were unregistered
    pub dropped: usize,
}

/// "Publish to topic" capability
///
/// Callers depend on this trait rather than on the in-memory broadcaster so a
/// networked pub/sub backend can be dropped in without touching them.
pub trait Publisher: Send + Sync {
    fn publish(&self, event: &DomainEvent) -> PublishReport;
}

/// Fans events out to the connections of a [`ConnectionRegistry`]
pub struct EventBroadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl EventBroadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }
}

impl Publisher for EventBroadcaster {
    fn publish(&self, event: &DomainEvent) -> PublishReport {
        let topic = route(event);
        let mut report = PublishReport {
            topic: topic.to_string(),
            ..PublishReport::default()
        };

        let frame = match event.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(topic = %topic, kind = event.kind(), error = %e, "Failed to serialize event");
                return report;
            }
        };

        let snapshot = self.registry.snapshot_for_topic(topic);
        let mut failed = Vec::new();

        for handle in &snapshot {
            match handle.try_send(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(SendFailure::Full) => {
                    tracing::warn!(
                        connection_id = %handle.id(),
                        topic = %topic,
                        "Send queue full, dropping connection"
                    );
                    failed.push(handle.id());
                }
                Err(SendFailure::Closed) => {
                    tracing::debug!(connection_id = %handle.id(), topic = %topic, "Connection already closed");
                    failed.push(handle.id());
                }
            }
        }

        for id in failed {
            self.registry.unregister(id);
            report.dropped += 1;
        }

        tracing::debug!(
            topic = %topic,
            kind = event.kind(),
            delivered = report.delivered,
            dropped = report.dropped,
            "Event published"
        );
        report
    }
}

/// Helper functions for the CRUD call sites
pub mod helpers {
    use super::*;
    use crate::types::{Pin, Status};

    /// Broadcast the full status list of a group
    pub fn statuses_changed(publisher: &dyn Publisher, slug: &str, statuses: &[Status]) -> PublishReport {
        publisher.publish(&DomainEvent::StatusesChanged {
            slug: slug.to_string(),
            statuses: statuses.to_vec(),
        })
    }

    /// Broadcast pin created event
    pub fn pin_created(publisher: &dyn Publisher, slug: &str, pin: &Pin) -> PublishReport {
        publisher.publish(&DomainEvent::PinCreated {
            slug: slug.to_string(),
            pin: pin.clone(),
        })
    }

    /// Broadcast new upvote count for a pin
    pub fn pin_upvoted(publisher: &dyn Publisher, slug: &str, id: i64, upvotes: i64) -> PublishReport {
        publisher.publish(&DomainEvent::PinUpvoted {
            slug: slug.to_string(),
            id,
            upvotes,
        })
    }

    /// Broadcast pin updated event (status or description)
    pub fn pin_updated(publisher: &dyn Publisher, slug: &str, pin: &Pin) -> PublishReport {
        publisher.publish(&DomainEvent::PinUpdated {
            slug: slug.to_string(),
            pin: pin.clone(),
        })
    }

    /// Broadcast every pin of a group
    pub fn pins_updated(publisher: &dyn Publisher, slug: &str, pins: &[Pin]) -> PublishReport {
        publisher.publish(&DomainEvent::PinsUpdated {
            slug: slug.to_string(),
            pins: pins.to_vec(),
        })
    }

    /// Broadcast group deleted event
    pub fn group_deleted(publisher: &dyn Publisher, slug: &str) -> PublishReport {
        publisher.publish(&DomainEvent::GroupDeleted {
            slug: slug.to_string(),
        })
    }

    /// A status was edited or removed: pins may now resolve to a different
    /// label, so the statuses go out first and the refreshed pins right after.
    pub fn status_edited(
        publisher: &dyn Publisher,
        slug: &str,
        statuses: &[Status],
        pins: &[Pin],
    ) -> (PublishReport, PublishReport) {
        let statuses = statuses_changed(publisher, slug, statuses);
        let pins = pins_updated(publisher, slug, pins);
        (statuses, pins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Pin;

    fn pin_created(slug: &str) -> DomainEvent {
        DomainEvent::PinCreated {
            slug: slug.to_string(),
            pin: Pin::new(1, 1.0, 2.0),
        }
    }

    #[test]
    fn test_publish_reaches_only_topic_subscribers() {
        let registry = Arc::new(ConnectionRegistry::default());
        let broadcaster = EventBroadcaster::new(Arc::clone(&registry));

        let (a, mut rx_a) = registry.register();
        let (b, mut rx_b) = registry.register();
        let (_c, mut rx_c) = registry.register();
        registry.set_topic(a.id(), "demo");
        registry.set_topic(b.id(), "other");

        let report = broadcaster.publish(&pin_created("demo"));

        assert_eq!(report.topic, "demo");
        assert_eq!(report.delivered, 1);
        assert_eq!(report.dropped, 0);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
        assert!(rx_c.try_recv().is_err());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let registry = Arc::new(ConnectionRegistry::default());
        let broadcaster = EventBroadcaster::new(registry);

        let report = broadcaster.publish(&pin_created("nobody"));
        assert_eq!(report.delivered, 0);
        assert_eq!(report.dropped, 0);
    }

    #[test]
    fn test_full_queue_drops_connection_but_not_others() {
        let registry = Arc::new(ConnectionRegistry::new(1));
        let broadcaster = EventBroadcaster::new(Arc::clone(&registry));

        let (slow, _rx_slow) = registry.register();
        let (fast, mut rx_fast) = registry.register();
        registry.set_topic(slow.id(), "demo");
        registry.set_topic(fast.id(), "demo");

        // Fill the slow connection's single slot
        slow.try_send("backlog".to_string()).unwrap();

        let report = broadcaster.publish(&pin_created("demo"));

        assert_eq!(report.delivered, 1);
        assert_eq!(report.dropped, 1);
        assert!(!registry.contains(slow.id()));
        assert!(registry.contains(fast.id()));
        assert!(rx_fast.try_recv().is_ok());
    }

    #[test]
    fn test_status_edited_orders_statuses_before_pins() {
        let registry = Arc::new(ConnectionRegistry::default());
        let broadcaster = EventBroadcaster::new(Arc::clone(&registry));
        let (a, mut rx) = registry.register();
        registry.set_topic(a.id(), "demo");

        let statuses = vec![crate::types::Status::new(1, "Done", "#10b981")];
        let pins = vec![Pin::new(1, 0.0, 0.0).with_status(1, "Done")];
        helpers::status_edited(&broadcaster, "demo", &statuses, &pins);

        let first: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        let second: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(first["type"], "statuses_changed");
        assert_eq!(second["type"], "pins_updated");
        assert_eq!(second["pins"][0]["status"], "Done");
    }

    #[test]
    fn test_publish_through_trait_object() {
        let registry = Arc::new(ConnectionRegistry::default());
        let publisher: Arc<dyn Publisher> = Arc::new(EventBroadcaster::new(Arc::clone(&registry)));
        let (a, mut rx) = registry.register();
        registry.set_topic(a.id(), "demo");

        helpers::group_deleted(publisher.as_ref(), "demo");

        assert_eq!(rx.try_recv().unwrap(), r#"{"type":"group_deleted","slug":"demo"}"#);
    }
}
