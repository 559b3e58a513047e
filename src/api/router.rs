//! Route table and shared handler state.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::application::Aggregator;
use crate::config::SearchConfig;
use crate::realtime::SharedEventBus;

use super::handlers::{events, health, stations, ws};

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub event_bus: SharedEventBus,
    pub search: SearchConfig,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/stations/nearby", get(stations::nearby))
        .route("/api/events", post(events::publish))
        .route("/ws", get(ws::upgrade))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
