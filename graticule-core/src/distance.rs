//! Great-circle distance and rectangle/circle relation predicates.

use crate::rect::GeoRect;

/// Earth mean radius in meters (WGS84).
pub const EARTH_MEAN_RADIUS: f64 = 6_371_008.7714;

/// Earth ellipsoid semi-major axis in meters (WGS84).
pub const EARTH_SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

/// Earth ellipsoid semi-minor axis in meters (WGS84).
pub const EARTH_SEMI_MINOR_AXIS: f64 = 6_356_752.314245;

/// Equatorial circumference in meters.
pub const EARTH_EQUATOR: f64 = 2.0 * std::f64::consts::PI * EARTH_SEMI_MAJOR_AXIS;

/// Pole-to-pole (half meridian) distance in meters.
pub const EARTH_POLAR_DISTANCE: f64 = std::f64::consts::PI * EARTH_SEMI_MINOR_AXIS;

/// Haversine distance between two points in meters.
///
/// Spherical approximation; accuracy is ~0.3% for practical distances.
pub fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (dlon / 2.0).sin().powi(2);

    EARTH_MEAN_RADIUS * 2.0 * a.sqrt().asin()
}

/// Degrees of latitude spanned by a north-south distance in meters.
pub fn distance_to_degrees_lat(meters: f64) -> f64 {
    meters / (EARTH_POLAR_DISTANCE / 180.0)
}

/// Degrees of longitude spanned by an east-west distance in meters at the
/// given latitude. The cosine is floored away from zero so polar queries
/// degrade to the full longitude range instead of dividing by zero.
pub fn distance_to_degrees_lon(lat: f64, meters: f64) -> f64 {
    let cos_lat = lat.to_radians().cos().abs().max(0.001);
    meters / (cos_lat * EARTH_EQUATOR / 360.0)
}

/// Bounding box of a circle. The longitude bounds are left unnormalised
/// (they may exceed ±180) so the caller can split at the antimeridian.
pub fn circle_bbox(center_lat: f64, center_lon: f64, radius_m: f64) -> GeoRect {
    let lat_delta = distance_to_degrees_lat(radius_m);
    let lon_delta = distance_to_degrees_lon(center_lat, radius_m);
    GeoRect::new(
        center_lon - lon_delta,
        (center_lat - lat_delta).max(-90.0),
        center_lon + lon_delta,
        (center_lat + lat_delta).min(90.0),
    )
}

/// Closest point of `rect` to `(lat, lon)` by per-axis clamping.
fn closest_point(rect: &GeoRect, lat: f64, lon: f64) -> (f64, f64) {
    (
        lat.clamp(rect.min_lat, rect.max_lat),
        lon.clamp(rect.min_lon, rect.max_lon),
    )
}

fn corners_within(rect: &GeoRect, lat: f64, lon: f64, radius_m: f64) -> usize {
    [
        (rect.min_lat, rect.min_lon),
        (rect.min_lat, rect.max_lon),
        (rect.max_lat, rect.min_lon),
        (rect.max_lat, rect.max_lon),
    ]
    .iter()
    .filter(|&&(clat, clon)| haversine(lat, lon, clat, clon) <= radius_m)
    .count()
}

/// True if every corner of the rectangle lies within the circle.
pub fn rect_within_circle(rect: &GeoRect, lat: f64, lon: f64, radius_m: f64) -> bool {
    corners_within(rect, lat, lon, radius_m) == 4
}

/// True if the rectangle and circle boundaries cross: they overlap but the
/// rectangle is not fully inside the circle.
pub fn rect_crosses_circle(rect: &GeoRect, lat: f64, lon: f64, radius_m: f64) -> bool {
    let (near_lat, near_lon) = closest_point(rect, lat, lon);
    let overlaps = haversine(lat, lon, near_lat, near_lon) <= radius_m;
    overlaps && corners_within(rect, lat, lon, radius_m) < 4
}

/// Ray-cast point-in-polygon test over a closed or open ring of
/// `(lon, lat)` vertices. Points exactly on an edge may land either side.
pub fn point_in_polygon(lon: f64, lat: f64, ring: &[(f64, f64)]) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if ((yi > lat) != (yj > lat)) && lon < (xj - xi) * (lat - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}
