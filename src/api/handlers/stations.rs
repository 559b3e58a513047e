//! Nearby-station search endpoint.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::router::AppState;
use crate::config::SearchConfig;
use crate::domain::{Coordinates, Station};
use crate::sources::SearchQuery;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyParams {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_km: Option<f64>,
    pub max_results: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyResponse {
    pub stations: Vec<Station>,
    pub count: usize,
    /// Reference point the results were ranked against. Echoed back so
    /// the UI can tell when the default location was used.
    pub reference: Coordinates,
}

/// Resolve request parameters against configured defaults. A caller
/// without a location (geolocation denied or unavailable) searches
/// around the default reference point instead of failing; that point is
/// announced once at startup and echoed in the response.
pub(super) fn resolve_query(params: &NearbyParams, defaults: &SearchConfig) -> SearchQuery {
    SearchQuery {
        lat: params.lat.unwrap_or(defaults.default_lat),
        lng: params.lng.unwrap_or(defaults.default_lng),
        radius_km: params.radius_km.unwrap_or(defaults.default_radius_km),
        max_results: params.max_results.unwrap_or(defaults.default_max_results),
    }
}

pub async fn nearby(
    State(state): State<AppState>,
    Query(params): Query<NearbyParams>,
) -> Json<NearbyResponse> {
    let query = resolve_query(&params, &state.search);
    let stations = state.aggregator.search(query).await;

    Json(NearbyResponse {
        count: stations.len(),
        reference: Coordinates {
            lat: query.lat,
            lng: query.lng,
        },
        stations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_location_falls_back_to_default_reference() {
        let defaults = SearchConfig::default();
        let query = resolve_query(
            &NearbyParams {
                lat: None,
                lng: None,
                radius_km: None,
                max_results: None,
            },
            &defaults,
        );
        assert_eq!(query.lat, defaults.default_lat);
        assert_eq!(query.lng, defaults.default_lng);
        assert_eq!(query.radius_km, defaults.default_radius_km);
    }

    #[test]
    fn explicit_params_override_defaults() {
        let query = resolve_query(
            &NearbyParams {
                lat: Some(19.0760),
                lng: Some(72.8777),
                radius_km: Some(10.0),
                max_results: Some(5),
            },
            &SearchConfig::default(),
        );
        assert_eq!(query.lat, 19.0760);
        assert_eq!(query.radius_km, 10.0);
        assert_eq!(query.max_results, 5);
    }
}
