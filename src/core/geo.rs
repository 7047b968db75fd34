use serde::{Deserialize, Serialize};

const EARTH_RADIUS: f64 = 6378137.0;

/// A geographical coordinate in the longitude-first ordering every supported
/// map provider uses on the wire (`[lng, lat]`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    /// Creates a new coordinate pair.
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Validates that the coordinates are within valid ranges.
    pub fn is_valid(&self) -> bool {
        self.lat >= -90.0 && self.lat <= 90.0 && self.lng >= -180.0 && self.lng <= 180.0
    }

    /// Great-circle distance to another coordinate using the Haversine formula,
    /// in meters.
    pub fn distance_to(&self, other: &LngLat) -> f64 {
        let lat1_rad = self.lat.to_radians();
        let lat2_rad = other.lat.to_radians();
        let delta_lat = (other.lat - self.lat).to_radians();
        let delta_lng = (other.lng - self.lng).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS * c
    }

    /// Wraps longitude to the [-180, 180] range.
    pub fn wrap_lng(lng: f64) -> f64 {
        let wrapped = lng % 360.0;
        if wrapped > 180.0 {
            wrapped - 360.0
        } else if wrapped < -180.0 {
            wrapped + 360.0
        } else {
            wrapped
        }
    }
}

impl Default for LngLat {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl From<[f64; 2]> for LngLat {
    fn from(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

impl From<(f64, f64)> for LngLat {
    fn from(pair: (f64, f64)) -> Self {
        Self::new(pair.0, pair.1)
    }
}

/// Midpoint of a set of positions. Used when a capability implementation has
/// to approximate the vendor's auto-fit behavior.
pub fn path_center(positions: &[LngLat]) -> Option<LngLat> {
    if positions.is_empty() {
        return None;
    }

    let mut min_lng = f64::INFINITY;
    let mut min_lat = f64::INFINITY;
    let mut max_lng = f64::NEG_INFINITY;
    let mut max_lat = f64::NEG_INFINITY;

    for pos in positions {
        min_lng = min_lng.min(pos.lng);
        min_lat = min_lat.min(pos.lat);
        max_lng = max_lng.max(pos.lng);
        max_lat = max_lat.max(pos.lat);
    }

    Some(LngLat::new(
        (min_lng + max_lng) / 2.0,
        (min_lat + max_lat) / 2.0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity() {
        assert!(LngLat::new(116.397, 39.908).is_valid());
        assert!(!LngLat::new(190.0, 0.0).is_valid());
        assert!(!LngLat::new(0.0, 91.0).is_valid());
    }

    #[test]
    fn test_distance() {
        let beijing = LngLat::new(116.397, 39.908);
        let shanghai = LngLat::new(121.473, 31.230);
        let d = beijing.distance_to(&shanghai);
        // Roughly 1070 km
        assert!(d > 1_000_000.0 && d < 1_150_000.0);
    }

    #[test]
    fn test_wrap_lng() {
        assert_eq!(LngLat::wrap_lng(190.0), -170.0);
        assert_eq!(LngLat::wrap_lng(-190.0), 170.0);
        assert_eq!(LngLat::wrap_lng(45.0), 45.0);
    }

    #[test]
    fn test_path_center() {
        assert_eq!(path_center(&[]), None);
        let center = path_center(&[LngLat::new(0.0, 0.0), LngLat::new(2.0, 4.0)]).unwrap();
        assert_eq!(center, LngLat::new(1.0, 2.0));
    }
}
