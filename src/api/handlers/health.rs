//! Service health endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::router::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    /// Currently connected realtime clients.
    pub realtime_clients: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "charge-scout",
        version: env!("CARGO_PKG_VERSION"),
        realtime_clients: state.event_bus.subscriber_count(),
    })
}
