//! Typed handler registry for channel consumers.
//!
//! An `on(event_type, handler)` / `off` registry keyed by event type.
//! Handlers for one type run in registration order; a handler that
//! fails is logged and never prevents delivery to the handlers after
//! it. Subscriptions are guard-based so dropping the guard unsubscribes
//! and a forgotten `off` cannot leak handlers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tracing::warn;

use super::events::EventEnvelope;

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// An event handler. Returning `Err` is logged; it does not stop
/// dispatch to later handlers.
pub type Handler = Arc<dyn Fn(&EventEnvelope) -> HandlerResult + Send + Sync>;

/// Registry of handlers keyed by event type.
#[derive(Default)]
pub struct HandlerRegistry {
    // Vec order doubles as invocation order
    by_type: DashMap<String, Vec<(u64, Handler)>>,
    next_id: AtomicU64,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event type. The returned guard
    /// unsubscribes on drop.
    pub fn on(
        self: &Arc<Self>,
        event_type: impl Into<String>,
        handler: impl Fn(&EventEnvelope) -> HandlerResult + Send + Sync + 'static,
    ) -> Subscription {
        let event_type = event_type.into();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.by_type
            .entry(event_type.clone())
            .or_default()
            .push((id, Arc::new(handler)));

        Subscription {
            registry: Arc::downgrade(self),
            event_type,
            id,
        }
    }

    /// Remove one registration. No-op if it was already removed.
    pub fn off(&self, event_type: &str, id: u64) {
        if let Some(mut handlers) = self.by_type.get_mut(event_type) {
            handlers.retain(|(hid, _)| *hid != id);
        }
        self.by_type
            .remove_if(event_type, |_, handlers| handlers.is_empty());
    }

    /// Dispatch an envelope to all handlers registered for its type, in
    /// registration order.
    pub fn dispatch(&self, envelope: &EventEnvelope) {
        // clone out of the map so handlers run without holding the shard lock
        let handlers: Vec<Handler> = self
            .by_type
            .get(envelope.event.event_type())
            .map(|entry| entry.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        for handler in handlers {
            if let Err(e) = handler(envelope) {
                warn!(
                    event_type = envelope.event.event_type(),
                    error = %e,
                    "event handler failed, continuing with remaining handlers"
                );
            }
        }
    }

    pub fn handler_count(&self, event_type: &str) -> usize {
        self.by_type.get(event_type).map_or(0, |entry| entry.len())
    }
}

/// Guard for a registered handler; dropping it unsubscribes.
pub struct Subscription {
    registry: Weak<HandlerRegistry>,
    event_type: String,
    id: u64,
}

impl Subscription {
    /// Unsubscribe explicitly. Equivalent to dropping the guard.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.off(&self.event_type, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::events::{RealtimeEvent, StationEvent};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn station_created() -> EventEnvelope {
        EventEnvelope::new(RealtimeEvent::StationCreated(StationEvent {
            station_id: "st-1".into(),
            ..Default::default()
        }))
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let registry = Arc::new(HandlerRegistry::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        let o1 = Arc::clone(&order);
        let _s1 = registry.on("station-created", move |_| {
            o1.lock().unwrap().push(1);
            Ok(())
        });
        let o2 = Arc::clone(&order);
        let _s2 = registry.on("station-created", move |_| {
            o2.lock().unwrap().push(2);
            Ok(())
        });

        registry.dispatch(&station_created());
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn failing_handler_does_not_block_later_handlers() {
        let registry = Arc::new(HandlerRegistry::new());
        let reached = Arc::new(AtomicUsize::new(0));

        let _s1 = registry.on("station-created", |_| Err("boom".into()));
        let r = Arc::clone(&reached);
        let _s2 = registry.on("station-created", move |_| {
            r.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        registry.dispatch(&station_created());
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let registry = Arc::new(HandlerRegistry::new());
        let hits = Arc::new(AtomicUsize::new(0));

        let h = Arc::clone(&hits);
        let sub = registry.on("station-created", move |_| {
            h.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert_eq!(registry.handler_count("station-created"), 1);

        registry.dispatch(&station_created());
        drop(sub);
        assert_eq!(registry.handler_count("station-created"), 0);

        registry.dispatch(&station_created());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn explicit_unsubscribe_matches_drop() {
        let registry = Arc::new(HandlerRegistry::new());
        let sub = registry.on("payment-success", |_| Ok(()));
        sub.unsubscribe();
        assert_eq!(registry.handler_count("payment-success"), 0);
    }

    #[test]
    fn dispatch_ignores_unregistered_types() {
        let registry = Arc::new(HandlerRegistry::new());
        let _sub = registry.on("payment-success", |_| Ok(()));
        // must not panic or invoke anything
        registry.dispatch(&station_created());
    }
}
