//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`QueueEvent`]s. It is
//! designed to be shared via `Arc<EventBus>` across the application.
//! Delivery is best-effort: events carry no durable state, and nothing
//! in the data model depends on them being observed.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokenq_core::types::{EntryId, Timestamp};

// ---------------------------------------------------------------------------
// QueueEvent
// ---------------------------------------------------------------------------

/// An ephemeral notification fanned out to observers.
///
/// The event vocabulary is small and closed, so this is a typed enum
/// rather than a string-typed envelope. Serialized form is internally
/// tagged for WebSocket clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QueueEvent {
    /// Operator broadcast; no persisted effect on the data model.
    Announcement { message: String, at: Timestamp },
    /// A user requested entry to the line.
    EntryJoined { entry_id: EntryId, user_name: String },
    /// An entry was approved and issued a token.
    EntryApproved { entry_id: EntryId, token_number: i64 },
    /// The serving pointer advanced to a new token.
    TokenCalled { entry_id: EntryId, token_number: i64 },
    /// The whole queue was cleared.
    QueueReset,
}

impl QueueEvent {
    /// Build an announcement stamped with the current time.
    pub fn announcement(message: impl Into<String>) -> Self {
        QueueEvent::Announcement {
            message: message.into(),
            at: chrono::Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`QueueEvent`].
pub struct EventBus {
    sender: broadcast::Sender<QueueEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are
    /// dropped and slow receivers observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped;
    /// that is fine for ephemeral notifications.
    pub fn publish(&self, event: QueueEvent) {
        // Ignore the SendError -- it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(QueueEvent::announcement("counter 2 is closing"));

        let received = rx.recv().await.expect("should receive the event");
        match received {
            QueueEvent::Announcement { message, .. } => {
                assert_eq!(message, "counter 2 is closing");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let entry_id = uuid::Uuid::new_v4();
        bus.publish(QueueEvent::TokenCalled {
            entry_id,
            token_number: 7,
        });

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.expect("subscriber should receive") {
                QueueEvent::TokenCalled { token_number, .. } => {
                    assert_eq!(token_number, 7);
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        // No subscribers -- this must not panic.
        bus.publish(QueueEvent::QueueReset);
    }

    #[test]
    fn announcement_serializes_with_event_tag() {
        let json = serde_json::to_value(QueueEvent::announcement("hi")).unwrap();
        assert_eq!(json["event"], "announcement");
        assert_eq!(json["message"], "hi");
    }
}
