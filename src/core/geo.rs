//! Coordinate math for movement classification.

/// Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points, in meters (haversine).
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Speed in km/h for a distance covered over a time span.
pub fn speed_kmh(distance_m: f64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    (distance_m / elapsed_secs) * 3.6
}

/// Returns true for coordinates inside the valid WGS84 range.
pub fn valid_coords(lat: f64, lon: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_identical_points() {
        assert!(haversine_m(55.7558, 37.6173, 55.7558, 37.6173) < 1e-6);
    }

    #[test]
    fn moscow_to_petersburg_is_about_634_km() {
        let d = haversine_m(55.7558, 37.6173, 59.9311, 30.3609);
        assert!((d - 634_000.0).abs() < 5_000.0, "got {}", d);
    }

    #[test]
    fn short_hop_distance_is_plausible() {
        // Roughly 111 m per 0.001 degrees of latitude
        let d = haversine_m(55.7558, 37.6173, 55.7568, 37.6173);
        assert!((d - 111.0).abs() < 2.0, "got {}", d);
    }

    #[test]
    fn speed_handles_zero_elapsed() {
        assert_eq!(speed_kmh(100.0, 0.0), 0.0);
        // 100 m in 60 s = 6 km/h
        assert!((speed_kmh(100.0, 60.0) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn coordinate_validation() {
        assert!(valid_coords(55.0, 37.0));
        assert!(!valid_coords(91.0, 0.0));
        assert!(!valid_coords(0.0, -181.0));
    }
}
