//! Great-circle distance between coordinate pairs.

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometers between two points given as
/// (latitude, longitude) degree pairs.
///
/// Pure and infallible for finite inputs; callers filter out records
/// with missing coordinates before computing distances.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_for_identical_points() {
        assert_eq!(haversine_km(18.5204, 73.8567, 18.5204, 73.8567), 0.0);
        assert_eq!(haversine_km(0.0, 0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn symmetric() {
        let d1 = haversine_km(18.5204, 73.8567, 19.0760, 72.8777);
        let d2 = haversine_km(19.0760, 72.8777, 18.5204, 73.8567);
        assert!((d1 - d2).abs() < 1e-9);
    }

    #[test]
    fn pune_to_mumbai_roughly_120km() {
        // Pune city centre to Mumbai city centre, known to be ~120 km
        // as the crow flies.
        let d = haversine_km(18.5204, 73.8567, 19.0760, 72.8777);
        assert!(d > 100.0 && d < 140.0, "got {}", d);
    }

    #[test]
    fn one_degree_latitude_is_about_111km() {
        let d = haversine_km(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111.19).abs() < 0.5, "got {}", d);
    }
}
