use serde::{Deserialize, Serialize};
use std::fmt;

/// Decimal places kept when a coordinate is used as a cache key.
///
/// Four places is roughly 11 m at the equator, so repeated clicks on the
/// same map pixel collapse onto one key.
pub const CACHE_KEY_DECIMALS: i32 = 4;

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Returns `true` when both components are finite and inside the
    /// valid longitude/latitude ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }

    /// Rounded, hashable form of this coordinate.
    #[must_use]
    pub fn cache_key(&self) -> CoordinateKey {
        CoordinateKey::from(*self)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lon, self.lat)
    }
}

/// A coordinate rounded to [`CACHE_KEY_DECIMALS`] places, stored as scaled
/// integers so it can implement `Eq` and `Hash`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordinateKey {
    lon_e4: i64,
    lat_e4: i64,
}

impl From<Coordinate> for CoordinateKey {
    #[allow(clippy::cast_possible_truncation)]
    fn from(coordinate: Coordinate) -> Self {
        let scale = 10f64.powi(CACHE_KEY_DECIMALS);
        Self {
            lon_e4: (coordinate.lon * scale).round() as i64,
            lat_e4: (coordinate.lat * scale).round() as i64,
        }
    }
}

impl fmt::Display for CoordinateKey {
    #[allow(clippy::cast_precision_loss)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = 10f64.powi(CACHE_KEY_DECIMALS);
        write!(
            f,
            "({:.4}, {:.4})",
            self.lon_e4 as f64 / scale,
            self.lat_e4 as f64 / scale
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearby_points_share_cache_key() {
        let a = Coordinate::new(-122.389_91, 37.615_21);
        let b = Coordinate::new(-122.389_94, 37.615_18);
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_distant_points_have_distinct_keys() {
        let a = Coordinate::new(-122.3899, 37.6152);
        let b = Coordinate::new(-122.3901, 37.6152);
        assert_ne!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_negative_values_round_symmetrically() {
        let key = Coordinate::new(-0.000_06, 0.000_06).cache_key();
        assert_eq!(key.to_string(), "(-0.0001, 0.0001)");
    }

    #[test]
    fn test_validity() {
        assert!(Coordinate::new(0.0, 0.0).is_valid());
        assert!(!Coordinate::new(181.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, f64::NAN).is_valid());
    }
}
