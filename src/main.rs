//! Charge Scout server binary.
//!
//! Wires the source adapters, aggregator and event bus behind the HTTP
//! and websocket surface, with graceful shutdown on SIGINT/SIGTERM.

use std::sync::Arc;

use tracing::{error, info};

use charge_scout::application::Aggregator;
use charge_scout::config::{default_config_path, AppConfig};
use charge_scout::notifier::{JsonFileStore, NotificationCenter};
use charge_scout::realtime::create_event_bus;
use charge_scout::shared::shutdown::{listen_for_shutdown_signals, ShutdownSignal};
use charge_scout::sources::{CatalogAdapter, OpenChargeMapAdapter, StationProvider};
use charge_scout::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var("CHARGE_SCOUT_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| default_config_path());

    let config = match AppConfig::load(&config_path) {
        Ok(cfg) => {
            init_tracing(&cfg.logging.level);
            info!("configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            let cfg = AppConfig::default();
            init_tracing(&cfg.logging.level);
            error!("failed to load config: {}. using defaults", e);
            cfg
        }
    };

    info!("starting charge-scout");

    // ── Source adapters ────────────────────────────────────────
    let catalog = Arc::new(CatalogAdapter::new(
        config.catalog.base_url.clone(),
        config.catalog.timeout(),
    )?);
    let open_charge_map = Arc::new(OpenChargeMapAdapter::new(
        config.open_charge_map.base_url.clone(),
        config.open_charge_map.api_key.clone(),
        config.open_charge_map.timeout(),
    )?);
    info!(
        catalog = %config.catalog.base_url,
        ocm = %config.open_charge_map.base_url,
        "station sources configured"
    );
    info!(
        lat = config.search.default_lat,
        lng = config.search.default_lng,
        "default search reference point, used when callers send no location"
    );

    // catalog first: internal stations win distance ties
    let providers: Vec<Arc<dyn StationProvider>> = vec![catalog, open_charge_map];
    let aggregator = Arc::new(Aggregator::new(providers, config.search.source_timeout()));

    // ── Event bus ──────────────────────────────────────────────
    let event_bus = create_event_bus();
    info!("event bus initialized for realtime notifications");

    // ── Notification inbox ─────────────────────────────────────
    let store_path = config.notifications.store_path.clone().unwrap_or_else(|| {
        config_path
            .parent()
            .map(std::path::Path::to_path_buf)
            .unwrap_or_default()
            .join("notifications.json")
    });
    let notification_center = Arc::new(NotificationCenter::new(
        config.notifications.history_cap,
        Arc::new(JsonFileStore::new(store_path)),
    ));
    notification_center.spawn_listener(&event_bus);

    // ── Shutdown coordination ──────────────────────────────────
    let shutdown = ShutdownSignal::new();
    tokio::spawn(listen_for_shutdown_signals(shutdown.clone()));

    // ── HTTP + websocket server ────────────────────────────────
    let state = AppState {
        aggregator,
        event_bus,
        search: config.search.clone(),
    };
    let router = create_router(state);

    let address = config.server.address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("listening on http://{}", address);
    info!("realtime clients connect to ws://{}/ws", address);

    let server_shutdown = shutdown.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            server_shutdown.wait().await;
            info!("server received shutdown signal");
        })
        .await?;

    info!("charge-scout shutdown complete");
    Ok(())
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}
