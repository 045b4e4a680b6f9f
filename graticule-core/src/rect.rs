//! Axis-aligned geographic rectangle.

/// Axis-aligned bounding rectangle in degrees, (lon, lat) axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoRect {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl GeoRect {
    /// The whole WGS84 plane.
    pub const WORLD: GeoRect = GeoRect {
        min_lon: -180.0,
        min_lat: -90.0,
        max_lon: 180.0,
        max_lat: 90.0,
    };

    /// Create a new rectangle.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Width in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Height in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Centre point as (lon, lat).
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    /// Check if this rectangle overlaps another (closed bounds).
    pub fn intersects(&self, other: &GeoRect) -> bool {
        self.min_lon <= other.max_lon
            && self.max_lon >= other.min_lon
            && self.min_lat <= other.max_lat
            && self.max_lat >= other.min_lat
    }

    /// Check if this rectangle contains a point (closed bounds).
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// Check if this rectangle fully contains another.
    pub fn contains_rect(&self, other: &GeoRect) -> bool {
        self.min_lon <= other.min_lon
            && self.max_lon >= other.max_lon
            && self.min_lat <= other.min_lat
            && self.max_lat >= other.max_lat
    }

    /// An unnormalised rectangle reaches past the antimeridian when either
    /// lon bound lies outside [-180, 180].
    pub fn crosses_dateline(&self) -> bool {
        self.min_lon < -180.0 || self.max_lon > 180.0
    }
}
