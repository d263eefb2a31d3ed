//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>`. Publishers never block and
//! never fail; a subscriber that falls behind observes `RecvError::Lagged`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use studio_core::types::DbId;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// PlatformEvent
// ---------------------------------------------------------------------------

/// Something that happened in the studio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// Dot-separated event name, e.g. `"video.progress"`. See [`crate::names`].
    pub event_type: String,

    /// Entity kind the event is about (`"story"`, `"segment"`, ...).
    pub source_entity_type: Option<String>,

    pub source_entity_id: Option<DbId>,

    /// Event-specific data.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl PlatformEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            source_entity_type: None,
            source_entity_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_source(mut self, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Serialize `value` as the payload. Serialization failures leave the
    /// payload empty and are logged.
    pub fn with_serialized<T: Serialize>(self, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(payload) => self.with_payload(payload),
            Err(e) => {
                tracing::warn!(event_type = %self.event_type, error = %e, "Event payload not serializable");
                self
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use studio_events::bus::{EventBus, PlatformEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(PlatformEvent::new("generation.started"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    /// When the buffer is full the oldest un-consumed events are dropped.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped when nobody listens.
    pub fn publish(&self, event: PlatformEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::*;
    use crate::names;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(
            PlatformEvent::new(names::VIDEO_PROGRESS)
                .with_source("story", 42)
                .with_payload(serde_json::json!({"progress": 35})),
        );

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type, "video.progress");
        assert_eq!(received.source_entity_type.as_deref(), Some("story"));
        assert_eq!(received.source_entity_id, Some(42));
        assert_eq!(received.payload["progress"], 35);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(PlatformEvent::new(names::GENERATION_STARTED));

        assert_eq!(rx1.recv().await.unwrap().event_type, "generation.started");
        assert_eq!(rx2.recv().await.unwrap().event_type, "generation.started");
    }

    #[test]
    fn publish_with_no_subscribers_is_dropped() {
        let bus = EventBus::default();
        bus.publish(PlatformEvent::new("orphan.event"));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn serialized_payload() {
        #[derive(Serialize)]
        struct Row {
            id: i64,
            image_url: Option<String>,
        }

        let event = PlatformEvent::new(names::SEGMENT_ASSET_UPDATED).with_serialized(&Row {
            id: 3,
            image_url: Some("u".to_string()),
        });
        assert_eq!(event.payload["id"], 3);
        assert_eq!(event.payload["image_url"], "u");
    }

    #[test]
    fn bare_event_has_empty_object_payload() {
        let event = PlatformEvent::new("bare.event");
        assert!(event.source_entity_type.is_none());
        assert!(event.payload.is_object());
    }
}
