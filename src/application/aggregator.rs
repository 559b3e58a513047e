//! Station aggregation across data sources.
//!
//! Fans out one nearby-station query to every registered provider
//! concurrently, merges the results, annotates distances from the
//! reference point and returns one ranked list. Providers are already
//! best-effort, so a dead source shrinks the result set instead of
//! failing the search.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::domain::Station;
use crate::geo::haversine_km;
use crate::sources::{SearchQuery, StationProvider};

/// Merges and ranks stations from all registered providers.
pub struct Aggregator {
    providers: Vec<Arc<dyn StationProvider>>,
    /// Outer bound per provider, independent of each adapter's own
    /// transport timeout. A source that blows through it contributes
    /// nothing to the result.
    source_timeout: Duration,
}

impl Aggregator {
    pub fn new(providers: Vec<Arc<dyn StationProvider>>, source_timeout: Duration) -> Self {
        Self {
            providers,
            source_timeout,
        }
    }

    /// Run the query against every provider concurrently and return the
    /// merged list, sorted by ascending distance from the reference
    /// point and truncated to `max_results`.
    ///
    /// Provider registration order is preserved through the merge, so
    /// with the catalog registered first, internal stations win distance
    /// ties against external ones.
    pub async fn search(&self, query: SearchQuery) -> Vec<Station> {
        let fetches = self.providers.iter().map(|provider| {
            let provider = Arc::clone(provider);
            async move {
                match tokio::time::timeout(self.source_timeout, provider.fetch(&query)).await {
                    Ok(stations) => stations,
                    Err(_) => {
                        warn!(source = ?provider.source(), "source exceeded aggregate deadline");
                        Vec::new()
                    }
                }
            }
        });

        let mut merged: Vec<Station> = join_all(fetches).await.into_iter().flatten().collect();

        for station in &mut merged {
            station.distance_km = Some(haversine_km(
                query.lat,
                query.lng,
                station.coordinates.lat,
                station.coordinates.lng,
            ));
        }

        // stable sort keeps input order on ties
        merged.sort_by(|a, b| {
            a.distance_km
                .partial_cmp(&b.distance_km)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        merged.truncate(query.max_results);

        debug!(
            results = merged.len(),
            lat = query.lat,
            lng = query.lng,
            radius_km = query.radius_km,
            "nearby search completed"
        );
        merged
    }
}

/// Serializes a caller's searches so a stale response can never clobber
/// a newer one: each search takes a fresh token, and a search whose
/// token has been superseded by the time it completes yields `None`.
pub struct SearchSession {
    aggregator: Arc<Aggregator>,
    latest_token: AtomicU64,
}

impl SearchSession {
    pub fn new(aggregator: Arc<Aggregator>) -> Self {
        Self {
            aggregator,
            latest_token: AtomicU64::new(0),
        }
    }

    /// Search, discarding the result if a newer search was issued while
    /// this one was in flight.
    pub async fn search(&self, query: SearchQuery) -> Option<Vec<Station>> {
        let token = self.latest_token.fetch_add(1, Ordering::SeqCst) + 1;
        let results = self.aggregator.search(query).await;

        if self.latest_token.load(Ordering::SeqCst) != token {
            debug!(token, "discarding superseded search response");
            return None;
        }
        Some(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coordinates, Station, StationSource, StationType};
    use async_trait::async_trait;

    /// Reference point used across tests: Pune city centre.
    const REF: (f64, f64) = (18.5204, 73.8567);

    fn station(id: &str, lat: f64, lng: f64, source: StationSource) -> Station {
        Station {
            id: id.to_string(),
            name: format!("Station {}", id),
            address: String::new(),
            city: None,
            state: None,
            coordinates: Coordinates { lat, lng },
            charging_speed_kw: 22.0,
            station_type: StationType::Standard,
            is_available: true,
            price_per_kwh: 12.0,
            connector_types: vec!["Type 2 (Socket)".into()],
            source,
            is_live: source == StationSource::External,
            distance_km: None,
            rating: None,
        }
    }

    struct FakeProvider {
        source: StationSource,
        stations: Vec<Station>,
        delay: Duration,
    }

    #[async_trait]
    impl StationProvider for FakeProvider {
        fn source(&self) -> StationSource {
            self.source
        }

        async fn fetch(&self, _query: &SearchQuery) -> Vec<Station> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.stations.clone()
        }
    }

    fn provider(
        source: StationSource,
        stations: Vec<Station>,
        delay: Duration,
    ) -> Arc<dyn StationProvider> {
        Arc::new(FakeProvider {
            source,
            stations,
            delay,
        })
    }

    fn query() -> SearchQuery {
        SearchQuery {
            lat: REF.0,
            lng: REF.1,
            radius_km: 25.0,
            max_results: 20,
        }
    }

    /// Offsets from the reference point chosen so haversine distance is
    /// roughly the labelled number of kilometres.
    fn offset_km(km: f64) -> f64 {
        km / 111.19
    }

    #[tokio::test]
    async fn merges_and_sorts_by_distance() {
        // 2 internal + 3 external at ~5/12/20 km; the merged list must
        // interleave them purely by distance.
        let internal = provider(
            StationSource::Internal,
            vec![
                station("int-near", REF.0 + offset_km(2.0), REF.1, StationSource::Internal),
                station("int-far", REF.0 + offset_km(15.0), REF.1, StationSource::Internal),
            ],
            Duration::ZERO,
        );
        let external = provider(
            StationSource::External,
            vec![
                station("ext-5", REF.0 + offset_km(5.0), REF.1, StationSource::External),
                station("ext-12", REF.0 + offset_km(12.0), REF.1, StationSource::External),
                station("ext-20", REF.0 + offset_km(20.0), REF.1, StationSource::External),
            ],
            Duration::ZERO,
        );

        let aggregator = Aggregator::new(vec![internal, external], Duration::from_secs(5));
        let results = aggregator.search(query()).await;

        let ids: Vec<&str> = results.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["int-near", "ext-5", "ext-12", "int-far", "ext-20"]);

        // distances are present, non-negative and non-decreasing
        let mut prev = 0.0;
        for s in &results {
            let d = s.distance_km.expect("distance annotated");
            assert!(d >= 0.0);
            assert!(d >= prev);
            prev = d;
            assert_eq!(s.is_live, s.source == StationSource::External);
        }
    }

    #[tokio::test]
    async fn closer_reference_point_ranks_station_earlier() {
        let fixed = station("s", REF.0 + offset_km(10.0), REF.1, StationSource::Internal);
        let other = station("o", REF.0 + offset_km(6.0), REF.1, StationSource::Internal);
        let aggregator = Aggregator::new(
            vec![provider(
                StationSource::Internal,
                vec![fixed, other],
                Duration::ZERO,
            )],
            Duration::from_secs(5),
        );

        // P1 sits almost on top of "s"; P2 is the plain reference point.
        let near_s = SearchQuery {
            lat: REF.0 + offset_km(10.0),
            ..query()
        };
        let from_p1 = aggregator.search(near_s).await;
        let from_p2 = aggregator.search(query()).await;

        let rank = |rs: &[Station]| rs.iter().position(|x| x.id == "s").unwrap();
        assert!(rank(&from_p1) < rank(&from_p2));
    }

    #[tokio::test]
    async fn dead_external_source_leaves_internal_results_intact() {
        let internal = provider(
            StationSource::Internal,
            vec![station("int-1", REF.0, REF.1, StationSource::Internal)],
            Duration::ZERO,
        );
        // external "source" that takes longer than the aggregate deadline
        let external = provider(
            StationSource::External,
            vec![station("ext-1", REF.0, REF.1, StationSource::External)],
            Duration::from_secs(60),
        );

        let aggregator = Aggregator::new(vec![internal, external], Duration::from_millis(50));
        let results = aggregator.search(query()).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "int-1");
    }

    #[tokio::test]
    async fn internal_first_wins_distance_ties() {
        let internal = provider(
            StationSource::Internal,
            vec![station("int-tie", REF.0, REF.1, StationSource::Internal)],
            Duration::ZERO,
        );
        let external = provider(
            StationSource::External,
            vec![station("ext-tie", REF.0, REF.1, StationSource::External)],
            Duration::ZERO,
        );

        let aggregator = Aggregator::new(vec![internal, external], Duration::from_secs(5));
        let results = aggregator.search(query()).await;
        assert_eq!(results[0].id, "int-tie");
        assert_eq!(results[1].id, "ext-tie");
    }

    #[tokio::test]
    async fn truncates_to_max_results() {
        let stations: Vec<Station> = (0..10)
            .map(|i| {
                station(
                    &format!("s{}", i),
                    REF.0 + offset_km(i as f64),
                    REF.1,
                    StationSource::Internal,
                )
            })
            .collect();
        let aggregator = Aggregator::new(
            vec![provider(StationSource::Internal, stations, Duration::ZERO)],
            Duration::from_secs(5),
        );

        let results = aggregator
            .search(SearchQuery {
                max_results: 3,
                ..query()
            })
            .await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, "s0");
    }

    #[tokio::test]
    async fn stale_search_response_is_discarded() {
        let slow = Aggregator::new(
            vec![provider(
                StationSource::Internal,
                vec![station("slow", REF.0, REF.1, StationSource::Internal)],
                Duration::from_millis(100),
            )],
            Duration::from_secs(5),
        );
        let session = Arc::new(SearchSession::new(Arc::new(slow)));

        // issue search A, then search B before A resolves
        let session_a = Arc::clone(&session);
        let a = tokio::spawn(async move { session_a.search(query()).await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let b = session.search(query()).await;
        assert!(b.is_some(), "latest search must yield its results");

        let a = a.await.unwrap();
        assert!(a.is_none(), "superseded search must be discarded");
    }
}
