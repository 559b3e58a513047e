//! Open Charge Map adapter.
//!
//! Translates OCM point-of-interest records into the unified station
//! shape. OCM provides no price or rating, so both are synthesized
//! deterministically and flagged as live/external data; consumers can
//! tell them apart from authoritative catalog values via `source`.
//!
//! This source is strictly best-effort: any transport failure degrades
//! to an empty result with a warning and never blocks the aggregate call.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::domain::{
    Coordinates, Rating, SourceError, Station, StationSource, StationType, MIN_CHARGING_SPEED_KW,
};

use super::{SearchQuery, StationProvider};

/// Connector name used when OCM reports an unknown connection type code.
/// Type 2 is by far the most common connector in the data set.
const DEFAULT_CONNECTOR: &str = "Type 2 (Socket)";

/// External live-data adapter for Open Charge Map.
pub struct OpenChargeMapAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

// -- OCM native schema (subset) --

#[derive(Debug, Deserialize)]
struct Poi {
    #[serde(rename = "ID")]
    id: i64,
    #[serde(rename = "AddressInfo", default)]
    address_info: Option<AddressInfo>,
    #[serde(rename = "Connections", default)]
    connections: Vec<Connection>,
    #[serde(rename = "StatusType", default)]
    status_type: Option<StatusType>,
    #[serde(rename = "OperatorInfo", default)]
    operator_info: Option<OperatorInfo>,
}

#[derive(Debug, Deserialize)]
struct AddressInfo {
    #[serde(rename = "Title", default)]
    title: Option<String>,
    #[serde(rename = "AddressLine1", default)]
    address_line1: Option<String>,
    #[serde(rename = "Town", default)]
    town: Option<String>,
    #[serde(rename = "StateOrProvince", default)]
    state: Option<String>,
    #[serde(rename = "Latitude")]
    latitude: Option<f64>,
    #[serde(rename = "Longitude")]
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Connection {
    #[serde(rename = "PowerKW", default)]
    power_kw: Option<f64>,
    #[serde(rename = "ConnectionTypeID", default)]
    connection_type_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StatusType {
    #[serde(rename = "IsOperational", default)]
    is_operational: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct OperatorInfo {
    #[serde(rename = "Title", default)]
    title: Option<String>,
}

impl OpenChargeMapAdapter {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent("charge-scout/0.1")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
        })
    }

    async fn fetch_remote(&self, query: &SearchQuery) -> Result<Vec<Station>, SourceError> {
        let url = format!("{}/poi", self.base_url);
        let mut request = self.client.get(&url).query(&[
            ("output", "json".to_string()),
            ("latitude", query.lat.to_string()),
            ("longitude", query.lng.to_string()),
            ("distance", query.radius_km.to_string()),
            ("distanceunit", "KM".to_string()),
            ("maxresults", query.max_results.to_string()),
            ("compact", "true".to_string()),
            ("verbose", "false".to_string()),
        ]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Status(response.status().as_u16()));
        }

        let pois: Vec<Poi> = response.json().await?;
        Ok(pois.into_iter().filter_map(map_poi).collect())
    }
}

#[async_trait]
impl StationProvider for OpenChargeMapAdapter {
    fn source(&self) -> StationSource {
        StationSource::External
    }

    async fn fetch(&self, query: &SearchQuery) -> Vec<Station> {
        match self.fetch_remote(query).await {
            Ok(stations) => stations,
            Err(e) => {
                warn!(error = %e, "open charge map unreachable, continuing without live data");
                Vec::new()
            }
        }
    }
}

/// Map an OCM connection type code to a connector name. Unknown codes
/// fall back to the most common connector.
fn connector_name(connection_type_id: Option<i64>) -> &'static str {
    match connection_type_id {
        Some(1) => "Type 1 (J1772)",
        Some(2) => "CHAdeMO",
        Some(25) => "Type 2 (Socket)",
        Some(32) => "CCS (Type 1)",
        Some(33) => "CCS (Type 2)",
        Some(1036) => "Type 2 (Tethered)",
        _ => DEFAULT_CONNECTOR,
    }
}

/// Maximum positive per-connector power, or the nominal minimum when no
/// connection reports a positive value.
fn max_power_kw(connections: &[Connection]) -> f64 {
    connections
        .iter()
        .filter_map(|c| c.power_kw)
        .filter(|kw| *kw > 0.0)
        .fold(None, |best: Option<f64>, kw| {
            Some(best.map_or(kw, |b| b.max(kw)))
        })
        .unwrap_or(MIN_CHARGING_SPEED_KW)
}

/// Deterministic synthetic price for a live station. OCM carries no
/// tariff data; the estimate scales with the station tier and is only
/// ever shown alongside the live-data badge.
fn estimated_price_per_kwh(station_type: StationType) -> f64 {
    match station_type {
        StationType::Standard => 10.0,
        StationType::FastCharging => 14.0,
        StationType::SuperFast => 18.0,
    }
}

/// Deterministic synthetic rating derived from the POI id; varies across
/// stations without pretending to be real review data.
fn estimated_rating(poi_id: i64) -> Rating {
    let tenths = (poi_id.rem_euclid(15)) as f64 / 10.0;
    Rating {
        average: 3.5 + tenths,
        count: (poi_id.rem_euclid(40) + 5) as u32,
    }
}

fn map_poi(poi: Poi) -> Option<Station> {
    let address = poi.address_info?;
    let (lat, lng) = match (address.latitude, address.longitude) {
        (Some(lat), Some(lng)) => (lat, lng),
        _ => return None, // no coordinates, cannot be ranked
    };

    let speed_kw = max_power_kw(&poi.connections);
    let station_type = StationType::from_speed_kw(speed_kw);

    let mut connectors: Vec<String> = poi
        .connections
        .iter()
        .map(|c| connector_name(c.connection_type_id).to_string())
        .collect();
    if connectors.is_empty() {
        connectors.push(DEFAULT_CONNECTOR.to_string());
    }

    // Operational unless the status explicitly says otherwise.
    let is_available = poi
        .status_type
        .and_then(|s| s.is_operational)
        .unwrap_or(true);

    let name = address
        .title
        .filter(|t| !t.is_empty())
        .or_else(|| poi.operator_info.and_then(|o| o.title))
        .unwrap_or_else(|| "Charging Station".to_string());

    Some(Station {
        id: format!("ocm-{}", poi.id),
        name,
        address: address.address_line1.unwrap_or_default(),
        city: address.town,
        state: address.state,
        coordinates: Coordinates { lat, lng },
        charging_speed_kw: speed_kw,
        station_type,
        is_available,
        price_per_kwh: estimated_price_per_kwh(station_type),
        connector_types: super::dedupe_connectors(connectors),
        source: StationSource::External,
        is_live: true,
        distance_km: None,
        rating: Some(estimated_rating(poi.id)),
    })
}
