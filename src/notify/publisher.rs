//! # Notification Fan-out
//!
//! Best-effort publisher for lifecycle events over a real-time transport.
//! Targets are individual actors (delivered to their private room by the
//! socket gateway) or the shared admin channel.
//!
//! Delivery is fire-and-forget: no acknowledgment, no retry, no ordering
//! guarantee across recipients. A publish failure never fails or rolls back
//! the state transition that produced it.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::constants::ADMIN_CHANNEL;

/// Where a notification is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyTarget {
    /// A single actor's private room.
    Actor(Uuid),
    /// The shared channel every admin session joins.
    Admins,
}

impl NotifyTarget {
    /// Room name the socket gateway routes on.
    pub fn room(&self) -> String {
        match self {
            Self::Actor(id) => id.to_string(),
            Self::Admins => ADMIN_CHANNEL.to_string(),
        }
    }
}

/// A published lifecycle event.
#[derive(Debug, Clone)]
pub struct Notification {
    pub target: NotifyTarget,
    pub event: String,
    pub payload: Value,
    pub published_at: DateTime<Utc>,
}

/// High-throughput fan-out publisher for lifecycle events.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Notification>,
}

impl Notifier {
    /// Create a new publisher with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to a target. Never fails: a channel with no
    /// subscribers drops the event, which is acceptable for best-effort
    /// delivery.
    pub fn publish(&self, target: NotifyTarget, event: impl Into<String>, payload: Value) {
        let notification = Notification {
            target,
            event: event.into(),
            payload,
            published_at: Utc::now(),
        };

        tracing::debug!(
            room = %notification.target.room(),
            event = %notification.event,
            "📣 NOTIFY"
        );

        if let Err(broadcast::error::SendError(dropped)) = self.sender.send(notification) {
            // No subscribers attached; log and move on.
            tracing::debug!(
                room = %dropped.target.room(),
                event = %dropped.event,
                "notification dropped: no subscribers"
            );
        }
    }

    /// Subscribe to the notification stream (socket gateways, tests).
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Number of attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let notifier = Notifier::new(16);
        let mut rx = notifier.subscribe();

        let agent = Uuid::new_v4();
        notifier.publish(
            NotifyTarget::Actor(agent),
            "lead.assigned",
            json!({"lead_id": "abc"}),
        );

        let received = rx.recv().await.unwrap();
        assert_eq!(received.target, NotifyTarget::Actor(agent));
        assert_eq!(received.event, "lead.assigned");
        assert_eq!(received.payload["lead_id"], "abc");
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let notifier = Notifier::new(4);
        // Must not panic or error
        notifier.publish(NotifyTarget::Admins, "lead.accepted", json!({}));
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn test_room_names() {
        let id = Uuid::new_v4();
        assert_eq!(NotifyTarget::Actor(id).room(), id.to_string());
        assert_eq!(NotifyTarget::Admins.room(), "admins");
    }
}
