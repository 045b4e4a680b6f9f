//! Geographic point value type.

use crate::bits;
use crate::error::{Error, Result};
use crate::geohash;

/// A (lat, lon) pair on WGS84.
///
/// Points are immutable values; the constructors below rebuild one from any
/// of the index's machine encodings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
}

impl GeoPoint {
    /// Create a point from raw coordinates.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Full-precision geohash of this point.
    pub fn geohash(&self) -> String {
        // precision 12 is always valid
        geohash::string_encode(self.lat, self.lon, geohash::MAX_PRECISION)
            .expect("max precision is in range")
    }

    /// Rebuild a point from a Morton index hash.
    pub fn from_morton(hash: u64) -> Self {
        Self {
            lat: bits::morton_decode_lat(hash),
            lon: bits::morton_decode_lon(hash),
        }
    }

    /// Rebuild a point from a geohash string (cell min corner).
    pub fn from_geohash(hash: &str) -> Result<Self> {
        Ok(Self::from_morton(geohash::morton_encode_from_string(hash)?))
    }

    /// Rebuild a point from a packed geohash long (cell min corner).
    pub fn from_geohash_long(packed: u64) -> Result<Self> {
        Ok(Self::from_morton(geohash::morton_encode_from_long(packed)?))
    }

    /// Parse either a `"lat,lon"` pair or a geohash string.
    pub fn parse(value: &str) -> Result<Self> {
        match value.split_once(',') {
            Some((lat, lon)) => {
                let lat: f64 = lat
                    .trim()
                    .parse()
                    .map_err(|_| Error::invalid_coordinate(value))?;
                let lon: f64 = lon
                    .trim()
                    .parse()
                    .map_err(|_| Error::invalid_coordinate(value))?;
                Ok(Self::new(lat, lon))
            }
            None => Self::from_geohash(value.trim()),
        }
    }
}
