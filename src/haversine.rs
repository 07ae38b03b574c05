//! Haversine travel-time estimation.
//!
//! Uses great-circle distance to estimate travel time.
//! Less accurate than a road network (ignores roads) but always available.

use crate::model::Coordinate;

/// Average driving speed assumption for time estimation.
pub const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Shortest leg we ever estimate, so near-identical points still cost time.
pub const DEFAULT_MIN_TRAVEL_SECS: i64 = 5 * 60;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in kilometers.
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lng = (to.lng - from.lng).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Converts straight-line distance into a travel-time estimate.
#[derive(Debug, Clone, Copy)]
pub struct TravelTimeEstimator {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
    /// Floor applied to every estimate, in seconds.
    pub min_travel_secs: i64,
}

impl Default for TravelTimeEstimator {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
            min_travel_secs: DEFAULT_MIN_TRAVEL_SECS,
        }
    }
}

impl TravelTimeEstimator {
    pub fn new(speed_kmh: f64) -> Self {
        Self {
            speed_kmh,
            ..Self::default()
        }
    }

    /// Convert distance in km to travel time in seconds.
    pub fn km_to_seconds(&self, km: f64) -> i64 {
        let hours = km / self.speed_kmh;
        ((hours * 3600.0) as i64).max(self.min_travel_secs)
    }

    /// Estimated driving time between two points, in seconds.
    pub fn travel_secs(&self, from: Coordinate, to: Coordinate) -> i64 {
        self.km_to_seconds(haversine_km(from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_same_point() {
        let point = Coordinate::new(36.1, -115.1);
        assert_eq!(haversine_km(point, point), 0.0);
    }

    #[test]
    fn test_haversine_known_distance() {
        // Las Vegas (36.17, -115.14) to Los Angeles (34.05, -118.24)
        // Actual distance ~370 km
        let dist = haversine_km(Coordinate::new(36.17, -115.14), Coordinate::new(34.05, -118.24));
        assert!(dist > 350.0 && dist < 400.0, "LV to LA should be ~370km, got {}", dist);
    }

    #[test]
    fn test_haversine_symmetric() {
        let a = Coordinate::new(47.6062, -122.3321);
        let b = Coordinate::new(47.6205, -122.3493);
        assert_eq!(haversine_km(a, b), haversine_km(b, a));
    }

    #[test]
    fn test_reasonable_travel_time() {
        let estimator = TravelTimeEstimator::new(40.0);
        // 10 km at 40 km/h = 0.25 hours = 900 seconds
        assert_eq!(estimator.km_to_seconds(10.0), 900);
    }

    #[test]
    fn test_short_legs_are_floored() {
        let estimator = TravelTimeEstimator::default();
        let point = Coordinate::new(47.6, -122.3);
        assert_eq!(estimator.travel_secs(point, point), 300);
        // 1 km at 40 km/h = 90 seconds, below the floor
        assert_eq!(estimator.km_to_seconds(1.0), 300);
    }
}
