//! Inbound change-event endpoint.
//!
//! The CRUD backend posts entity lifecycle events here; they are
//! stamped into envelopes and broadcast to connected realtime clients.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::api::router::AppState;
use crate::realtime::RealtimeEvent;

#[derive(Serialize)]
pub struct PublishResponse {
    pub id: String,
    pub delivered_to: usize,
}

pub async fn publish(
    State(state): State<AppState>,
    Json(event): Json<RealtimeEvent>,
) -> Result<Json<PublishResponse>, StatusCode> {
    // events this version does not know cannot be re-serialized for
    // subscribers; reject them at the door
    if matches!(event, RealtimeEvent::Unknown) {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let subscribers = state.event_bus.subscriber_count();
    let envelope = state.event_bus.publish(event);
    Ok(Json(PublishResponse {
        id: envelope.id,
        delivered_to: subscribers,
    }))
}
