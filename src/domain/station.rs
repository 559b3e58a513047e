//! Unified station model
//!
//! Every station, regardless of which source produced it, is normalized
//! into this shape before aggregation. The `source` field is set once by
//! the producing adapter and never inferred afterwards.

use serde::{Deserialize, Serialize};

/// Charging speed below which nothing meaningful can be derived; used as
/// the floor when an external record has no positive connector rating.
pub const MIN_CHARGING_SPEED_KW: f64 = 7.0;

/// Threshold for the Fast Charging tier (kW).
pub const FAST_CHARGING_KW: f64 = 50.0;

/// Threshold for the Super Fast tier (kW).
pub const SUPER_FAST_KW: f64 = 150.0;

/// Geographic coordinates. Records lacking these are dropped by the
/// adapters before they ever reach the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Station tier derived from the maximum charging speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StationType {
    Standard,
    #[serde(rename = "Fast Charging")]
    FastCharging,
    #[serde(rename = "Super Fast")]
    SuperFast,
}

impl StationType {
    /// Derive the tier from a charging speed in kW.
    pub fn from_speed_kw(kw: f64) -> Self {
        if kw >= SUPER_FAST_KW {
            StationType::SuperFast
        } else if kw >= FAST_CHARGING_KW {
            StationType::FastCharging
        } else {
            StationType::Standard
        }
    }
}

/// Which adapter produced a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StationSource {
    /// First-party catalog owned by platform operators.
    Internal,
    /// Third-party crowd-sourced live data (Open Charge Map).
    External,
}

/// Aggregated user rating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub average: f64,
    pub count: u32,
}

/// A charging station in the unified shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    /// Unique within a merged result set. External adapters namespace
    /// their ids (e.g. `ocm-12345`) so they cannot collide with catalog ids.
    pub id: String,
    pub name: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub coordinates: Coordinates,
    /// Maximum charging speed in kW, never negative.
    pub charging_speed_kw: f64,
    pub station_type: StationType,
    pub is_available: bool,
    /// Internal source is authoritative; external stations carry a
    /// synthetic estimate, flagged as such via `source` / `is_live`.
    pub price_per_kwh: f64,
    pub connector_types: Vec<String>,
    pub source: StationSource,
    /// Mirrors `source == External`.
    pub is_live: bool,
    /// Distance from the query reference point; absent until the
    /// aggregator annotates it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_thresholds() {
        assert_eq!(StationType::from_speed_kw(7.0), StationType::Standard);
        assert_eq!(StationType::from_speed_kw(49.9), StationType::Standard);
        assert_eq!(StationType::from_speed_kw(50.0), StationType::FastCharging);
        assert_eq!(StationType::from_speed_kw(149.9), StationType::FastCharging);
        assert_eq!(StationType::from_speed_kw(150.0), StationType::SuperFast);
        assert_eq!(StationType::from_speed_kw(350.0), StationType::SuperFast);
    }

    #[test]
    fn station_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&StationType::FastCharging).unwrap(),
            "\"Fast Charging\""
        );
        assert_eq!(
            serde_json::to_string(&StationType::SuperFast).unwrap(),
            "\"Super Fast\""
        );
        assert_eq!(
            serde_json::to_string(&StationType::Standard).unwrap(),
            "\"Standard\""
        );
    }

    #[test]
    fn station_serializes_camel_case() {
        let station = Station {
            id: "st-1".into(),
            name: "Test".into(),
            address: "Somewhere".into(),
            city: None,
            state: None,
            coordinates: Coordinates { lat: 18.52, lng: 73.85 },
            charging_speed_kw: 60.0,
            station_type: StationType::FastCharging,
            is_available: true,
            price_per_kwh: 12.5,
            connector_types: vec!["CCS (Type 2)".into()],
            source: StationSource::Internal,
            is_live: false,
            distance_km: Some(1.25),
            rating: None,
        };

        let json = serde_json::to_value(&station).unwrap();
        assert_eq!(json["chargingSpeedKw"], 60.0);
        assert_eq!(json["isAvailable"], true);
        assert_eq!(json["source"], "internal");
        assert_eq!(json["distanceKm"], 1.25);
        assert!(json.get("rating").is_none());
    }
}
