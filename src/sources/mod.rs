//! Station data sources.
//!
//! Each source implements [`StationProvider`] and normalizes its native
//! records into the unified [`Station`] shape. The aggregator depends on
//! the trait only, never on a concrete adapter.

pub mod catalog;
pub mod open_charge_map;

use async_trait::async_trait;

use crate::domain::{Station, StationSource};

pub use catalog::CatalogAdapter;
pub use open_charge_map::OpenChargeMapAdapter;

/// A nearby-station query: reference point, search radius and result cap.
#[derive(Debug, Clone, Copy)]
pub struct SearchQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius_km: f64,
    pub max_results: usize,
}

/// A source of stations near a reference point.
///
/// `fetch` is best-effort: adapters recover from their own transport
/// failures (fallback list for the catalog, empty list for external
/// sources) so a broken source never fails the aggregate call. Records
/// without coordinates are dropped before returning.
#[async_trait]
pub trait StationProvider: Send + Sync {
    /// Which source this provider represents; stamped on every station
    /// it returns.
    fn source(&self) -> StationSource;

    async fn fetch(&self, query: &SearchQuery) -> Vec<Station>;
}

/// Remove duplicate connector names while preserving first-seen order.
pub(crate) fn dedupe_connectors(connectors: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    connectors
        .into_iter()
        .filter(|c| seen.insert(c.clone()))
        .collect()
}
