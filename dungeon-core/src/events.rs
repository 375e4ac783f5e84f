//! Events the engine publishes to external listeners.
//!
//! Publication is fire-and-forget over a broadcast channel: the publisher
//! never learns who is listening, never waits for them, and a slow listener
//! only lags itself.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::{AvatarId, LocationId};

/// An avatar's position changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarMoved {
    /// Who moved.
    pub avatar_id: AvatarId,
    /// Where they are now.
    pub new_location_id: LocationId,
    /// Whether a third party pulled them there (reversible).
    pub temporary: bool,
}

/// Everything published on the [`EventBus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DungeonEvent {
    /// See [`AvatarMoved`].
    AvatarMoved(AvatarMoved),
}

/// Broadcast bus for [`DungeonEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DungeonEvent>,
}

impl EventBus {
    /// Create a bus buffering `capacity` events per subscriber.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. Never blocks and never fails.
    pub fn publish(&self, event: DungeonEvent) {
        if self.tx.send(event).is_err() {
            // No subscribers - this is normal, not an error
            tracing::trace!("No listeners for dungeon event");
        }
    }

    /// Register a new listener. It receives every event published afterwards.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DungeonEvent> {
        self.tx.subscribe()
    }

    /// Number of live listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_capacity(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moved(id: &str) -> DungeonEvent {
        DungeonEvent::AvatarMoved(AvatarMoved {
            avatar_id: AvatarId::new(id),
            new_location_id: LocationId::new("crypt"),
            temporary: false,
        })
    }

    #[test]
    fn publish_without_listeners_is_silent() {
        let bus = EventBus::default();
        assert_eq!(bus.listener_count(), 0);
        bus.publish(moved("a"));
    }

    #[tokio::test]
    async fn every_listener_receives() {
        let bus = EventBus::with_capacity(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.publish(moved("a"));

        assert_eq!(first.recv().await.expect("recv"), moved("a"));
        assert_eq!(second.recv().await.expect("recv"), moved("a"));
    }

    #[test]
    fn event_json_shape() {
        let json = serde_json::to_value(moved("a")).expect("serialize");
        assert_eq!(json["type"], "avatarMoved");
        assert_eq!(json["avatar_id"], "a");
        assert_eq!(json["temporary"], false);
    }
}
