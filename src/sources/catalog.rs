//! First-party station catalog adapter.
//!
//! Queries the platform's own catalog endpoint and maps its records 1:1
//! into the unified shape. On transport failure it degrades to a small
//! fixed fallback list so the UI is never empty on first load; the
//! degradation is logged as a warning, never surfaced as an error.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::domain::{Coordinates, Rating, SourceError, Station, StationSource, StationType};
use crate::shared::retry::{retry_with_backoff, RetryConfig};

use super::{SearchQuery, StationProvider};

/// Internal catalog adapter.
pub struct CatalogAdapter {
    client: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

/// Native catalog record, pre-normalization.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogStation {
    #[serde(alias = "_id")]
    id: String,
    name: String,
    #[serde(default)]
    address: String,
    city: Option<String>,
    state: Option<String>,
    coordinates: Option<Coordinates>,
    #[serde(default)]
    charging_speed_kw: f64,
    #[serde(default)]
    price_per_kwh: f64,
    #[serde(default = "default_available")]
    is_available: bool,
    #[serde(default)]
    connector_types: Vec<String>,
    rating: Option<Rating>,
}

fn default_available() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    stations: Vec<CatalogStation>,
}

impl CatalogAdapter {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            retry: RetryConfig {
                max_attempts: 2,
                initial_delay: Duration::from_millis(250),
                ..Default::default()
            },
        })
    }

    async fn fetch_remote(&self, query: &SearchQuery) -> Result<Vec<Station>, SourceError> {
        let url = format!("{}/stations", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", query.lat.to_string()),
                ("lng", query.lng.to_string()),
                ("radiusKm", query.radius_km.to_string()),
                ("limit", query.max_results.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status().as_u16()));
        }

        let body: CatalogResponse = response.json().await?;
        Ok(body
            .stations
            .into_iter()
            .filter_map(map_catalog_station)
            .collect())
    }

    /// Known-good stations served when the catalog is unreachable.
    pub fn fallback_stations() -> Vec<Station> {
        vec![
            fallback(
                "catalog-fallback-1",
                "MG Road Charging Hub",
                "142 MG Road",
                18.5293,
                73.8560,
                50.0,
                12.5,
                &["CCS (Type 2)", "Type 2 (Socket)"],
                4.5,
                132,
            ),
            fallback(
                "catalog-fallback-2",
                "Koregaon Park Supercharge",
                "North Main Road, Koregaon Park",
                18.5362,
                73.8940,
                150.0,
                18.0,
                &["CCS (Type 2)"],
                4.7,
                86,
            ),
            fallback(
                "catalog-fallback-3",
                "Hinjewadi Phase 1 Point",
                "Rajiv Gandhi Infotech Park",
                18.5913,
                73.7389,
                22.0,
                10.0,
                &["Type 2 (Socket)", "Type 1 (J1772)"],
                4.1,
                54,
            ),
        ]
    }
}

#[async_trait]
impl StationProvider for CatalogAdapter {
    fn source(&self) -> StationSource {
        StationSource::Internal
    }

    async fn fetch(&self, query: &SearchQuery) -> Vec<Station> {
        let result = retry_with_backoff(
            self.retry.clone(),
            || self.fetch_remote(query),
            SourceError::is_transient,
            "catalog_fetch",
        )
        .await;

        match result {
            Ok(stations) => stations,
            Err(e) => {
                warn!(error = %e, "catalog unreachable, serving fallback station list");
                Self::fallback_stations()
            }
        }
    }
}

fn map_catalog_station(raw: CatalogStation) -> Option<Station> {
    let coordinates = raw.coordinates?;
    Some(Station {
        id: raw.id,
        name: raw.name,
        address: raw.address,
        city: raw.city,
        state: raw.state,
        coordinates,
        charging_speed_kw: raw.charging_speed_kw.max(0.0),
        station_type: StationType::from_speed_kw(raw.charging_speed_kw),
        is_available: raw.is_available,
        price_per_kwh: raw.price_per_kwh,
        connector_types: super::dedupe_connectors(raw.connector_types),
        source: StationSource::Internal,
        is_live: false,
        distance_km: None,
        rating: raw.rating,
    })
}

#[allow(clippy::too_many_arguments)]
fn fallback(
    id: &str,
    name: &str,
    address: &str,
    lat: f64,
    lng: f64,
    speed_kw: f64,
    price: f64,
    connectors: &[&str],
    rating_avg: f64,
    rating_count: u32,
) -> Station {
    Station {
        id: id.to_string(),
        name: name.to_string(),
        address: address.to_string(),
        city: Some("Pune".to_string()),
        state: Some("Maharashtra".to_string()),
        coordinates: Coordinates { lat, lng },
        charging_speed_kw: speed_kw,
        station_type: StationType::from_speed_kw(speed_kw),
        is_available: true,
        price_per_kwh: price,
        connector_types: connectors.iter().map(|c| c.to_string()).collect(),
        source: StationSource::Internal,
        is_live: false,
        distance_km: None,
        rating: Some(Rating {
            average: rating_avg,
            count: rating_count,
        }),
    }
}
