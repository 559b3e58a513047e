//! # Charge Scout
//!
//! Station discovery and live-state synchronization core for an EV
//! charging platform: merges the first-party station catalog with Open
//! Charge Map live data into one distance-ranked list, and pushes
//! entity lifecycle events to connected clients over a persistent
//! websocket channel.
//!
//! ## Architecture
//!
//! - **domain**: unified station model and error taxonomy
//! - **geo**: haversine distance
//! - **sources**: one adapter per data source behind [`sources::StationProvider`]
//! - **application**: aggregation, ranking and stale-search suppression
//! - **realtime**: event vocabulary, server-side broadcast bus and the
//!   reconnecting client channel
//! - **notifier**: event-driven notification inbox with local persistence
//! - **api**: axum routes (nearby search, event ingress, websocket)
//! - **shared**: retry/backoff and shutdown coordination

pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod geo;
pub mod notifier;
pub mod realtime;
pub mod shared;
pub mod sources;

pub use api::{create_router, AppState};
pub use application::{Aggregator, SearchSession};
pub use config::{default_config_path, AppConfig};
pub use domain::{Station, StationSource, StationType};
pub use notifier::{NotificationCenter, DEFAULT_HISTORY_CAP};
pub use realtime::{
    create_event_bus, ChannelState, EventBus, EventEnvelope, RealtimeClient,
    RealtimeClientConfig, RealtimeEvent, SharedEventBus,
};
pub use sources::{CatalogAdapter, OpenChargeMapAdapter, SearchQuery, StationProvider};
