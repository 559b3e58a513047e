//! Server-side event bus.
//!
//! Tokio broadcast channel fanning mutation events out to every
//! connected websocket session. Delivery is best-effort: a subscriber
//! that lags past the channel capacity loses the oldest events.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::events::{EventEnvelope, RealtimeEvent};

const DEFAULT_CAPACITY: usize = 256;

/// Broadcasts realtime events to all subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
    subscriber_count: Arc<AtomicUsize>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscriber_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wrap an event in an envelope and publish it. Publishing with no
    /// subscribers is normal (no UI clients connected).
    pub fn publish(&self, event: RealtimeEvent) -> EventEnvelope {
        let envelope = EventEnvelope::new(event);
        match self.sender.send(envelope.clone()) {
            Ok(receivers) => {
                debug!(
                    event_type = envelope.event.event_type(),
                    receivers, "event published"
                );
            }
            Err(_) => {
                debug!(
                    event_type = envelope.event.event_type(),
                    "event published with no subscribers"
                );
            }
        }
        envelope
    }

    pub fn subscribe(&self) -> EventSubscriber {
        self.subscriber_count.fetch_add(1, Ordering::SeqCst);
        EventSubscriber {
            receiver: self.sender.subscribe(),
            subscriber_count: Arc::clone(&self.subscriber_count),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriber_count.load(Ordering::SeqCst)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receives events from the bus.
pub struct EventSubscriber {
    receiver: broadcast::Receiver<EventEnvelope>,
    subscriber_count: Arc<AtomicUsize>,
}

impl EventSubscriber {
    /// Next event, or `None` once the bus is gone. Lagged gaps are
    /// logged and skipped; the channel is a notification signal, not a
    /// replayable log.
    pub async fn recv(&mut self) -> Option<EventEnvelope> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) => return Some(envelope),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "event subscriber lagged, events dropped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for EventSubscriber {
    fn drop(&mut self) {
        self.subscriber_count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Shared handle used across the server.
pub type SharedEventBus = Arc<EventBus>;

pub fn create_event_bus() -> SharedEventBus {
    Arc::new(EventBus::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::events::StationEvent;
    use std::time::Duration;

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let bus = EventBus::new();
        let mut subscriber = bus.subscribe();

        bus.publish(RealtimeEvent::StationCreated(StationEvent {
            station_id: "st-1".into(),
            name: Some("New Hub".into()),
            city: None,
        }));

        let received = tokio::time::timeout(Duration::from_millis(100), subscriber.recv())
            .await
            .expect("timeout")
            .expect("no event");
        assert_eq!(received.event.event_type(), "station-created");
        assert!(!received.id.is_empty());
    }

    #[test]
    fn subscriber_count_tracks_drops() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);

        let sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        drop(sub1);
        assert_eq!(bus.subscriber_count(), 1);
    }
}
