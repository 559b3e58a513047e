//! Realtime event vocabulary.
//!
//! One variant per entity-lifecycle transition; every payload carries the
//! entity's identifier. Wire names are kebab-case (`station-created`,
//! `payment-success`, ...) and the whole event travels inside an
//! [`EventEnvelope`] with a unique id and timestamp.
//!
//! The `Unknown` catch-all keeps older clients forward-compatible: an
//! unrecognized tag deserializes into it regardless of what payload the
//! `data` field carries, and is simply ignored downstream. That needs a
//! hand-written `Deserialize`: the derived tagged representation only
//! tolerates unknown tags when the payload is empty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// All events carried on the realtime channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum RealtimeEvent {
    StationCreated(StationEvent),
    StationUpdated(StationEvent),
    StationDeleted(StationEvent),
    StationAvailabilityChanged(AvailabilityEvent),
    StationApproved(StationEvent),
    StationRejected(StationEvent),
    BookingCreated(BookingEvent),
    BookingStatusChanged(BookingEvent),
    BookingCancelled(BookingEvent),
    PaymentSuccess(PaymentEvent),
    PaymentFailed(PaymentEvent),
    ReviewSubmitted(ReviewEvent),
    ReviewApproved(ReviewEvent),
    ReviewRejected(ReviewEvent),
    RentalRequested(RentalEvent),
    RentalApproved(RentalEvent),
    RentalRejected(RentalEvent),
    RentalDelivered(RentalEvent),
    RentalPickedUp(RentalEvent),
    /// Free-form server notification.
    Notification(GenericNotification),
    /// Any event type this client version does not recognize. Never
    /// re-serialized; producers cannot emit it.
    #[serde(skip_serializing)]
    Unknown,
}

impl<'de> Deserialize<'de> for RealtimeEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Frame {
            #[serde(rename = "type")]
            tag: String,
            #[serde(default)]
            data: serde_json::Value,
        }

        // Absent payloads read as empty objects so every payload field
        // falls back to its default.
        fn payload<T, E>(data: serde_json::Value) -> Result<T, E>
        where
            T: serde::de::DeserializeOwned,
            E: serde::de::Error,
        {
            let data = if data.is_null() {
                serde_json::Value::Object(serde_json::Map::new())
            } else {
                data
            };
            serde_json::from_value(data).map_err(E::custom)
        }

        let frame = Frame::deserialize(deserializer)?;
        let event = match frame.tag.as_str() {
            "station-created" => RealtimeEvent::StationCreated(payload(frame.data)?),
            "station-updated" => RealtimeEvent::StationUpdated(payload(frame.data)?),
            "station-deleted" => RealtimeEvent::StationDeleted(payload(frame.data)?),
            "station-availability-changed" => {
                RealtimeEvent::StationAvailabilityChanged(payload(frame.data)?)
            }
            "station-approved" => RealtimeEvent::StationApproved(payload(frame.data)?),
            "station-rejected" => RealtimeEvent::StationRejected(payload(frame.data)?),
            "booking-created" => RealtimeEvent::BookingCreated(payload(frame.data)?),
            "booking-status-changed" => RealtimeEvent::BookingStatusChanged(payload(frame.data)?),
            "booking-cancelled" => RealtimeEvent::BookingCancelled(payload(frame.data)?),
            "payment-success" => RealtimeEvent::PaymentSuccess(payload(frame.data)?),
            "payment-failed" => RealtimeEvent::PaymentFailed(payload(frame.data)?),
            "review-submitted" => RealtimeEvent::ReviewSubmitted(payload(frame.data)?),
            "review-approved" => RealtimeEvent::ReviewApproved(payload(frame.data)?),
            "review-rejected" => RealtimeEvent::ReviewRejected(payload(frame.data)?),
            "rental-requested" => RealtimeEvent::RentalRequested(payload(frame.data)?),
            "rental-approved" => RealtimeEvent::RentalApproved(payload(frame.data)?),
            "rental-rejected" => RealtimeEvent::RentalRejected(payload(frame.data)?),
            "rental-delivered" => RealtimeEvent::RentalDelivered(payload(frame.data)?),
            "rental-picked-up" => RealtimeEvent::RentalPickedUp(payload(frame.data)?),
            "notification" => RealtimeEvent::Notification(payload(frame.data)?),
            _ => RealtimeEvent::Unknown,
        };
        Ok(event)
    }
}

impl RealtimeEvent {
    /// Wire name of the event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            RealtimeEvent::StationCreated(_) => "station-created",
            RealtimeEvent::StationUpdated(_) => "station-updated",
            RealtimeEvent::StationDeleted(_) => "station-deleted",
            RealtimeEvent::StationAvailabilityChanged(_) => "station-availability-changed",
            RealtimeEvent::StationApproved(_) => "station-approved",
            RealtimeEvent::StationRejected(_) => "station-rejected",
            RealtimeEvent::BookingCreated(_) => "booking-created",
            RealtimeEvent::BookingStatusChanged(_) => "booking-status-changed",
            RealtimeEvent::BookingCancelled(_) => "booking-cancelled",
            RealtimeEvent::PaymentSuccess(_) => "payment-success",
            RealtimeEvent::PaymentFailed(_) => "payment-failed",
            RealtimeEvent::ReviewSubmitted(_) => "review-submitted",
            RealtimeEvent::ReviewApproved(_) => "review-approved",
            RealtimeEvent::ReviewRejected(_) => "review-rejected",
            RealtimeEvent::RentalRequested(_) => "rental-requested",
            RealtimeEvent::RentalApproved(_) => "rental-approved",
            RealtimeEvent::RentalRejected(_) => "rental-rejected",
            RealtimeEvent::RentalDelivered(_) => "rental-delivered",
            RealtimeEvent::RentalPickedUp(_) => "rental-picked-up",
            RealtimeEvent::Notification(_) => "notification",
            RealtimeEvent::Unknown => "unknown",
        }
    }

    /// The station this event concerns, when it is station-scoped.
    /// Used to fan events out only to clients that joined the station.
    pub fn station_id(&self) -> Option<&str> {
        let id = match self {
            RealtimeEvent::StationCreated(e)
            | RealtimeEvent::StationUpdated(e)
            | RealtimeEvent::StationDeleted(e)
            | RealtimeEvent::StationApproved(e)
            | RealtimeEvent::StationRejected(e) => &e.station_id,
            RealtimeEvent::StationAvailabilityChanged(e) => &e.station_id,
            RealtimeEvent::BookingCreated(e)
            | RealtimeEvent::BookingStatusChanged(e)
            | RealtimeEvent::BookingCancelled(e) => match &e.station_id {
                Some(id) => id,
                None => return None,
            },
            RealtimeEvent::ReviewSubmitted(e)
            | RealtimeEvent::ReviewApproved(e)
            | RealtimeEvent::ReviewRejected(e) => match &e.station_id {
                Some(id) => id,
                None => return None,
            },
            _ => return None,
        };
        if id.is_empty() {
            None
        } else {
            Some(id)
        }
    }
}

/// Station lifecycle payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StationEvent {
    pub station_id: String,
    pub name: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AvailabilityEvent {
    pub station_id: String,
    pub is_available: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingEvent {
    pub booking_id: String,
    pub station_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentEvent {
    pub payment_id: String,
    pub booking_id: Option<String>,
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewEvent {
    pub review_id: String,
    pub station_id: Option<String>,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RentalEvent {
    pub rental_id: String,
    pub equipment_name: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenericNotification {
    pub title: Option<String>,
    pub message: Option<String>,
}

/// Client-initiated channel intents, used to scope server-side event
/// emission to stations the client cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ClientIntent {
    #[serde(rename_all = "camelCase")]
    JoinStation { station_id: String },
    #[serde(rename_all = "camelCase")]
    LeaveStation { station_id: String },
}

/// Wire wrapper carrying delivery metadata alongside the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: RealtimeEvent,
}

impl EventEnvelope {
    pub fn new(event: RealtimeEvent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event,
        }
    }
}
