//! Notification inbox.
//!
//! Turns qualifying realtime events into user-visible notifications
//! with a bounded, newest-first history and read/unread bookkeeping.
//! Every mutation persists immediately so a reload reconstructs the
//! same inbox. Unrecognized event types are ignored, which lets the
//! event vocabulary grow without breaking older clients.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::debug;

use crate::realtime::event_bus::EventBus;
use crate::realtime::events::{EventEnvelope, RealtimeEvent};

use super::notification::{Notification, NotificationLevel};
use super::store::{persist_best_effort, NotificationStore};

/// Default bound on the persisted history.
pub const DEFAULT_HISTORY_CAP: usize = 50;

/// Bounded notification history with read-state tracking.
pub struct NotificationCenter {
    cap: usize,
    store: Arc<dyn NotificationStore>,
    // newest first; mutations are serialized through this lock
    history: Mutex<Vec<Notification>>,
}

impl NotificationCenter {
    /// Build the center, reconstructing prior state from the store.
    pub fn new(cap: usize, store: Arc<dyn NotificationStore>) -> Self {
        let mut history = store.load().unwrap_or_else(|e| {
            debug!(error = %e, "could not load notification history, starting empty");
            Vec::new()
        });
        history.truncate(cap);
        Self {
            cap,
            store,
            history: Mutex::new(history),
        }
    }

    /// Consume one channel event. Returns the created notification, or
    /// `None` when the event type does not produce one.
    pub fn handle_event(&self, envelope: &EventEnvelope) -> Option<Notification> {
        let (title, message, level) = render(&envelope.event)?;
        let notification = Notification::new(title, message, level);

        let mut history = self.lock();
        history.insert(0, notification.clone());
        // FIFO on age: evict the oldest entries past the cap, read or not
        history.truncate(self.cap);
        persist_best_effort(self.store.as_ref(), &history);
        Some(notification)
    }

    /// Mark one notification read. Returns whether it existed.
    pub fn mark_read(&self, id: &str) -> bool {
        let mut history = self.lock();
        let Some(notification) = history.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        notification.read = true;
        persist_best_effort(self.store.as_ref(), &history);
        true
    }

    pub fn mark_all_read(&self) {
        let mut history = self.lock();
        for notification in history.iter_mut() {
            notification.read = true;
        }
        persist_best_effort(self.store.as_ref(), &history);
    }

    /// Delete one notification. Returns whether it existed.
    pub fn delete(&self, id: &str) -> bool {
        let mut history = self.lock();
        let before = history.len();
        history.retain(|n| n.id != id);
        let removed = history.len() != before;
        if removed {
            persist_best_effort(self.store.as_ref(), &history);
        }
        removed
    }

    pub fn unread_count(&self) -> usize {
        self.lock().iter().filter(|n| !n.read).count()
    }

    /// Snapshot of the history, newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().clone()
    }

    /// Subscribe to the bus and feed events into the inbox until the
    /// bus is dropped. Channel events are serialized, so inbox writes
    /// never overlap.
    pub fn spawn_listener(self: &Arc<Self>, bus: &EventBus) -> JoinHandle<()> {
        let center = Arc::clone(self);
        let mut subscriber = bus.subscribe();
        tokio::spawn(async move {
            while let Some(envelope) = subscriber.recv().await {
                center.handle_event(&envelope);
            }
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Notification>> {
        self.history.lock().expect("notification lock poisoned")
    }
}

/// Placeholder for identifiers or names absent from a malformed payload.
fn present(value: &str) -> &str {
    if value.is_empty() {
        "(unknown)"
    } else {
        value
    }
}

fn name_or_id<'a>(name: &'a Option<String>, id: &'a str) -> &'a str {
    match name {
        Some(n) if !n.is_empty() => n,
        _ => present(id),
    }
}

/// Static per-type templates. Returns `None` for event types that do
/// not surface as notifications.
fn render(event: &RealtimeEvent) -> Option<(String, String, NotificationLevel)> {
    use NotificationLevel::*;
    use RealtimeEvent::*;

    let rendered = match event {
        StationCreated(e) => (
            "New Station Listed".to_string(),
            format!("Station {} is now available for booking", name_or_id(&e.name, &e.station_id)),
            Info,
        ),
        StationUpdated(e) => (
            "Station Updated".to_string(),
            format!("Station {} details were updated", name_or_id(&e.name, &e.station_id)),
            Info,
        ),
        StationDeleted(e) => (
            "Station Removed".to_string(),
            format!("Station {} is no longer listed", name_or_id(&e.name, &e.station_id)),
            Warning,
        ),
        StationAvailabilityChanged(e) if e.is_available => (
            "Station Available".to_string(),
            format!("Station {} is available again", present(&e.station_id)),
            Success,
        ),
        StationAvailabilityChanged(e) => (
            "Station Unavailable".to_string(),
            format!("Station {} is currently unavailable", present(&e.station_id)),
            Warning,
        ),
        StationApproved(e) => (
            "Station Approved".to_string(),
            format!("Your station {} was approved", name_or_id(&e.name, &e.station_id)),
            Success,
        ),
        StationRejected(e) => (
            "Station Rejected".to_string(),
            format!("Your station {} was rejected", name_or_id(&e.name, &e.station_id)),
            Error,
        ),
        BookingCreated(e) => (
            "Booking Confirmed".to_string(),
            format!("Booking {} was created", present(&e.booking_id)),
            Success,
        ),
        BookingStatusChanged(e) => (
            "Booking Update".to_string(),
            format!(
                "Booking {} is now {}",
                present(&e.booking_id),
                e.status.as_deref().unwrap_or("updated")
            ),
            Info,
        ),
        BookingCancelled(e) => (
            "Booking Cancelled".to_string(),
            format!("Booking {} was cancelled", present(&e.booking_id)),
            Warning,
        ),
        PaymentSuccess(e) => (
            "Payment Received".to_string(),
            match e.amount {
                Some(amount) => format!("Payment {} of {:.2} completed", present(&e.payment_id), amount),
                None => format!("Payment {} completed", present(&e.payment_id)),
            },
            Success,
        ),
        PaymentFailed(e) => (
            "Payment Failed".to_string(),
            format!("Payment {} could not be processed", present(&e.payment_id)),
            Error,
        ),
        ReviewSubmitted(e) => (
            "Review Submitted".to_string(),
            format!("Review {} is awaiting moderation", present(&e.review_id)),
            Info,
        ),
        ReviewApproved(e) => (
            "Review Published".to_string(),
            format!("Review {} was approved", present(&e.review_id)),
            Success,
        ),
        ReviewRejected(e) => (
            "Review Rejected".to_string(),
            format!("Review {} was rejected", present(&e.review_id)),
            Error,
        ),
        RentalRequested(e) => (
            "Rental Requested".to_string(),
            format!("Rental {} was requested", present(&e.rental_id)),
            Info,
        ),
        RentalApproved(e) => (
            "Rental Approved".to_string(),
            format!(
                "Your rental of {} was approved",
                e.equipment_name.as_deref().unwrap_or("(unknown equipment)")
            ),
            Success,
        ),
        RentalRejected(e) => (
            "Rental Rejected".to_string(),
            format!("Rental {} was rejected", present(&e.rental_id)),
            Error,
        ),
        RentalDelivered(e) => (
            "Equipment Delivered".to_string(),
            format!(
                "{} has been delivered",
                e.equipment_name.as_deref().unwrap_or("Your rental equipment")
            ),
            Success,
        ),
        RentalPickedUp(e) => (
            "Equipment Picked Up".to_string(),
            format!("Rental {} was picked up", present(&e.rental_id)),
            Info,
        ),
        Notification(e) => (
            e.title.clone().unwrap_or_else(|| "Notification".to_string()),
            e.message.clone().unwrap_or_default(),
            Info,
        ),
        Unknown => return None,
    };
    Some(rendered)
}
