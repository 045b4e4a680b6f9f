//! Morton term-enumeration filters.
//!
//! Point fields index each document as a single Morton-coded term, and the
//! term dictionary iterates those terms in sorted order. A filter turns a
//! spatial predicate into accept/seek decisions over that iteration:
//!
//! 1. **Range computation**: the 62-bit Morton space is split bit by bit
//!    against the query bounding box. A span entirely inside the query
//!    becomes a full-match range; a span still crossing the boundary at the
//!    detail level becomes a post-filtered range; everything else is
//!    discarded or split further.
//! 2. **Cell test**: the split uses the acceptor's `cell_within` /
//!    `cell_crosses` predicates, so a distance query prunes by
//!    corner-distance instead of plain interval overlap.
//! 3. **Point refinement**: terms landing in a post-filtered range are
//!    decoded back to (lon, lat) and checked exactly.
//!
//! A query bounding box that reaches past the antimeridian is split into
//! two filters combined with OR semantics by the caller.

use crate::error::{Result, SpatialError};
use graticule_core::bits;
use graticule_core::distance::{
    circle_bbox, haversine, point_in_polygon, rect_crosses_circle, rect_within_circle,
};
use graticule_core::rect::GeoRect;

/// Decision for one candidate term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptStatus {
    /// The term matches.
    Yes,
    /// The term does not match; keep iterating.
    No,
    /// The term does not match; the enumerator may seek forward to the
    /// given term.
    NoAndSeek(u64),
    /// No further term can match.
    End,
}

/// Spatial predicate plugged into [`GeoTermFilter`].
pub trait TermAcceptor {
    /// Bounding box of the matching region, normalised to ±180.
    fn bbox(&self) -> &GeoRect;

    /// The rectangle lies entirely inside the matching region.
    fn cell_within(&self, rect: &GeoRect) -> bool;

    /// The rectangle overlaps the boundary of the matching region.
    fn cell_crosses(&self, rect: &GeoRect) -> bool;

    /// Exact test for a decoded point.
    fn accept_point(&self, lon: f64, lat: f64) -> bool;
}

/// Levels are halvings of the 62-bit Morton space; one level consumes two
/// bits. The cap bounds the range count for sloppy or tiny queries.
const MAX_DETAIL_LEVEL: u32 = 16;

/// Detail level for a query extent: the first level whose cell width drops
/// under the tolerated slop, capped at [`MAX_DETAIL_LEVEL`].
fn detail_level_for(rect: &GeoRect, distance_error_pct: f64) -> u32 {
    let span = (rect.width() + rect.height()) / 2.0;
    let err = distance_error_pct.clamp(0.0, 0.5) * span / 2.0;
    if err <= 0.0 {
        return MAX_DETAIL_LEVEL;
    }
    let mut level = 1;
    while level < MAX_DETAIL_LEVEL && 360.0 / (1u64 << level) as f64 > err {
        level += 1;
    }
    level
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TermRange {
    start: u64,
    end: u64,
    /// Terms in this range still need point refinement.
    boundary: bool,
}

/// Two-phase acceptor over a sorted Morton term iteration.
pub struct GeoTermFilter<A> {
    acceptor: A,
    ranges: Vec<TermRange>,
    cursor: usize,
}

impl<A: TermAcceptor> GeoTermFilter<A> {
    /// Build the filter, computing the term ranges for the acceptor's
    /// region at the given slop.
    pub fn new(acceptor: A, distance_error_pct: f64) -> Self {
        let detail = detail_level_for(acceptor.bbox(), distance_error_pct);
        let mut filter = Self {
            acceptor,
            ranges: Vec::new(),
            cursor: 0,
        };
        filter.compute_range(0, 61, detail);
        filter.merge_ranges();
        tracing::debug!(
            ranges = filter.ranges.len(),
            detail,
            "computed morton term ranges"
        );
        filter
    }

    /// Split a Morton span one bit further and relate both halves.
    fn compute_range(&mut self, term: u64, shift: u32, detail: u32) {
        let split = term | (1u64 << shift);
        let upper_max = term | ((1u64 << (shift + 1)) - 1);
        let lower_max = split - 1;
        self.relate_and_recurse(term, lower_max, shift, detail);
        self.relate_and_recurse(split, upper_max, shift, detail);
    }

    fn relate_and_recurse(&mut self, start: u64, end: u64, res: u32, detail: u32) {
        // an aligned Morton span decodes to a rectangle: the low bits of
        // `start` are all zero (min corner) and of `end` all one (max)
        let rect = GeoRect::new(
            bits::morton_decode_lon(start),
            bits::morton_decode_lat(start),
            bits::morton_decode_lon(end),
            bits::morton_decode_lat(end),
        );
        let level = (62 - res) >> 1;
        let within = self.acceptor.cell_within(&rect);
        if within || (level == detail && self.acceptor.cell_crosses(&rect)) {
            self.ranges.push(TermRange {
                start,
                end,
                boundary: !within,
            });
        } else if level < detail && rect.intersects(self.acceptor.bbox()) {
            self.compute_range(start, res - 1, detail);
        }
    }

    /// Fuse contiguous ranges of the same kind. The recursion pushes
    /// ranges in ascending start order already.
    fn merge_ranges(&mut self) {
        let mut merged: Vec<TermRange> = Vec::with_capacity(self.ranges.len());
        for range in self.ranges.drain(..) {
            match merged.last_mut() {
                Some(prev)
                    if prev.boundary == range.boundary && prev.end + 1 == range.start =>
                {
                    prev.end = range.end;
                }
                _ => merged.push(range),
            }
        }
        self.ranges = merged;
    }

    /// First term any range can match; the enumerator seeks here before
    /// iterating.
    pub fn seek_floor(&self) -> Option<u64> {
        self.ranges.first().map(|r| r.start)
    }

    /// Decide one candidate term. Terms must arrive in ascending order.
    pub fn accept(&mut self, term: u64) -> AcceptStatus {
        while let Some(range) = self.ranges.get(self.cursor) {
            if range.end < term {
                self.cursor += 1;
                continue;
            }
            if term < range.start {
                return AcceptStatus::NoAndSeek(range.start);
            }
            if range.boundary {
                let lon = bits::morton_decode_lon(term);
                let lat = bits::morton_decode_lat(term);
                return if self.acceptor.accept_point(lon, lat) {
                    AcceptStatus::Yes
                } else {
                    AcceptStatus::No
                };
            }
            return AcceptStatus::Yes;
        }
        AcceptStatus::End
    }

    pub fn acceptor(&self) -> &A {
        &self.acceptor
    }

    /// Number of computed ranges; boundary ranges included.
    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }
}

/// Plain interval-overlap acceptor for a bounding-box query.
#[derive(Debug, Clone)]
pub struct BBoxAcceptor {
    rect: GeoRect,
}

impl BBoxAcceptor {
    /// `rect` must already be normalised to ±180; split unnormalised boxes
    /// with [`split_bbox`] first.
    pub fn new(rect: GeoRect) -> Self {
        Self { rect }
    }
}

impl TermAcceptor for BBoxAcceptor {
    fn bbox(&self) -> &GeoRect {
        &self.rect
    }

    fn cell_within(&self, rect: &GeoRect) -> bool {
        self.rect.contains_rect(rect)
    }

    fn cell_crosses(&self, rect: &GeoRect) -> bool {
        self.rect.intersects(rect) && !self.rect.contains_rect(rect)
    }

    fn accept_point(&self, lon: f64, lat: f64) -> bool {
        self.rect.contains_point(lon, lat)
    }
}

/// Corner-distance acceptor for a point-radius query.
#[derive(Debug, Clone)]
pub struct DistanceAcceptor {
    center_lat: f64,
    center_lon: f64,
    radius_m: f64,
    bbox: GeoRect,
}

impl DistanceAcceptor {
    fn new(center_lat: f64, center_lon: f64, radius_m: f64, bbox: GeoRect) -> Self {
        Self {
            center_lat,
            center_lon,
            radius_m,
            bbox,
        }
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }
}

impl TermAcceptor for DistanceAcceptor {
    fn bbox(&self) -> &GeoRect {
        &self.bbox
    }

    fn cell_within(&self, rect: &GeoRect) -> bool {
        rect_within_circle(rect, self.center_lat, self.center_lon, self.radius_m)
    }

    fn cell_crosses(&self, rect: &GeoRect) -> bool {
        rect_crosses_circle(rect, self.center_lat, self.center_lon, self.radius_m)
    }

    fn accept_point(&self, lon: f64, lat: f64) -> bool {
        haversine(self.center_lat, self.center_lon, lat, lon) <= self.radius_m
    }
}

/// Annulus acceptor for a distance range query: inclusive lower and upper
/// distance bounds around a centre point.
#[derive(Debug, Clone)]
pub struct DistanceRangeAcceptor {
    center_lat: f64,
    center_lon: f64,
    lower_m: f64,
    upper_m: f64,
    bbox: GeoRect,
}

impl DistanceRangeAcceptor {
    fn new(center_lat: f64, center_lon: f64, lower_m: f64, upper_m: f64, bbox: GeoRect) -> Self {
        Self {
            center_lat,
            center_lon,
            lower_m,
            upper_m,
            bbox,
        }
    }

    /// Shortest distance from the centre to the rectangle; zero when the
    /// centre lies inside.
    fn min_distance(&self, rect: &GeoRect) -> f64 {
        let lat = self.center_lat.clamp(rect.min_lat, rect.max_lat);
        let lon = self.center_lon.clamp(rect.min_lon, rect.max_lon);
        haversine(self.center_lat, self.center_lon, lat, lon)
    }
}

impl TermAcceptor for DistanceRangeAcceptor {
    fn bbox(&self) -> &GeoRect {
        &self.bbox
    }

    fn cell_within(&self, rect: &GeoRect) -> bool {
        rect_within_circle(rect, self.center_lat, self.center_lon, self.upper_m)
            && self.min_distance(rect) >= self.lower_m
    }

    fn cell_crosses(&self, rect: &GeoRect) -> bool {
        self.min_distance(rect) <= self.upper_m && !self.cell_within(rect)
    }

    fn accept_point(&self, lon: f64, lat: f64) -> bool {
        let d = haversine(self.center_lat, self.center_lon, lat, lon);
        d >= self.lower_m && d <= self.upper_m
    }
}

/// Point-in-polygon acceptor. Cell tests fall back to the polygon's
/// bounding box, so every range is post-filtered; exactness comes from the
/// ray-cast refinement.
#[derive(Debug, Clone)]
pub struct PolygonAcceptor {
    ring: Vec<(f64, f64)>,
    bbox: GeoRect,
}

impl PolygonAcceptor {
    /// Build from a ring of `(lon, lat)` vertices, open or closed.
    pub fn new(ring: Vec<(f64, f64)>) -> Result<Self> {
        if ring.len() < 3 {
            return Err(SpatialError::invalid_shape(
                "polygon ring needs at least 3 vertices",
            ));
        }
        let mut bbox = GeoRect::new(
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        );
        for &(lon, lat) in &ring {
            bbox.min_lon = bbox.min_lon.min(lon);
            bbox.max_lon = bbox.max_lon.max(lon);
            bbox.min_lat = bbox.min_lat.min(lat);
            bbox.max_lat = bbox.max_lat.max(lat);
        }
        Ok(Self { ring, bbox })
    }
}

impl TermAcceptor for PolygonAcceptor {
    fn bbox(&self) -> &GeoRect {
        &self.bbox
    }

    fn cell_within(&self, _rect: &GeoRect) -> bool {
        // conservative: no full-match ranges, every term is refined
        false
    }

    fn cell_crosses(&self, rect: &GeoRect) -> bool {
        self.bbox.intersects(rect)
    }

    fn accept_point(&self, lon: f64, lat: f64) -> bool {
        point_in_polygon(lon, lat, &self.ring)
    }
}

/// Split an unnormalised bounding box at the antimeridian. Returns the box
/// unchanged when it stays inside ±180, the full longitude band when it
/// wraps all the way around, and the two abutting pieces otherwise.
pub fn split_bbox(rect: GeoRect) -> Vec<GeoRect> {
    if rect.width() >= 360.0 {
        return vec![GeoRect::new(-180.0, rect.min_lat, 180.0, rect.max_lat)];
    }
    if !rect.crosses_dateline() {
        return vec![rect];
    }
    if rect.min_lon < -180.0 {
        vec![
            GeoRect::new(-180.0, rect.min_lat, rect.max_lon, rect.max_lat),
            GeoRect::new(rect.min_lon + 360.0, rect.min_lat, 180.0, rect.max_lat),
        ]
    } else {
        vec![
            GeoRect::new(-180.0, rect.min_lat, rect.max_lon - 360.0, rect.max_lat),
            GeoRect::new(rect.min_lon, rect.min_lat, 180.0, rect.max_lat),
        ]
    }
}

/// Filters for a bounding-box query; two when the box wraps the
/// antimeridian, combined with OR semantics.
pub fn bbox_filters(rect: GeoRect, distance_error_pct: f64) -> Vec<GeoTermFilter<BBoxAcceptor>> {
    split_bbox(rect)
        .into_iter()
        .map(|part| GeoTermFilter::new(BBoxAcceptor::new(part), distance_error_pct))
        .collect()
}

/// Filters for a point-radius query. The circle's bounding box is computed
/// from the radius and split at the antimeridian; refinement is haversine.
pub fn distance_filters(
    center_lat: f64,
    center_lon: f64,
    radius_m: f64,
    distance_error_pct: f64,
) -> Vec<GeoTermFilter<DistanceAcceptor>> {
    let bbox = circle_bbox(center_lat, center_lon, radius_m);
    split_bbox(bbox)
        .into_iter()
        .map(|part| {
            GeoTermFilter::new(
                DistanceAcceptor::new(center_lat, center_lon, radius_m, part),
                distance_error_pct,
            )
        })
        .collect()
}

/// Filters for a distance range (annulus) query with inclusive bounds.
/// The bounding box comes from the upper bound alone; the lower bound only
/// tightens the cell tests and the refinement.
pub fn distance_range_filters(
    center_lat: f64,
    center_lon: f64,
    lower_m: f64,
    upper_m: f64,
    distance_error_pct: f64,
) -> Result<Vec<GeoTermFilter<DistanceRangeAcceptor>>> {
    if lower_m < 0.0 || upper_m < lower_m {
        return Err(SpatialError::invalid_config(format!(
            "distance range [{lower_m}, {upper_m}] is not a valid interval"
        )));
    }
    let bbox = circle_bbox(center_lat, center_lon, upper_m);
    Ok(split_bbox(bbox)
        .into_iter()
        .map(|part| {
            GeoTermFilter::new(
                DistanceRangeAcceptor::new(center_lat, center_lon, lower_m, upper_m, part),
                distance_error_pct,
            )
        })
        .collect())
}

/// Filter for a polygon query. The ring must stay inside ±180; wrapping
/// polygons are the shape layer's concern.
pub fn polygon_filter(
    ring: Vec<(f64, f64)>,
    distance_error_pct: f64,
) -> Result<GeoTermFilter<PolygonAcceptor>> {
    Ok(GeoTermFilter::new(
        PolygonAcceptor::new(ring)?,
        distance_error_pct,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive a filter over a sorted term list the way a term dictionary
    /// would, honouring seeks, and return the accepted terms.
    fn drive<A: TermAcceptor>(filter: &mut GeoTermFilter<A>, terms: &[u64]) -> Vec<u64> {
        let mut accepted = Vec::new();
        let mut floor = filter.seek_floor().unwrap_or(u64::MAX);
        let mut i = 0;
        while i < terms.len() {
            let term = terms[i];
            if term < floor {
                i += 1;
                continue;
            }
            match filter.accept(term) {
                AcceptStatus::Yes => accepted.push(term),
                AcceptStatus::No => {}
                AcceptStatus::NoAndSeek(target) => floor = target,
                AcceptStatus::End => break,
            }
            i += 1;
        }
        accepted
    }

    fn term_grid(
        lon_range: std::ops::Range<i32>,
        lat_range: std::ops::Range<i32>,
        step: f64,
    ) -> Vec<u64> {
        let mut terms = Vec::new();
        for lat in lat_range.clone() {
            for lon in lon_range.clone() {
                terms.push(bits::morton_encode(lon as f64 * step, lat as f64 * step));
            }
        }
        terms.sort_unstable();
        terms.dedup();
        terms
    }

    #[test]
    fn bbox_filter_matches_brute_force() {
        let rect = GeoRect::new(-5.0, -3.0, 7.0, 9.0);
        let terms = term_grid(-20..20, -20..20, 1.0);
        let mut filter = bbox_filters(rect, 0.0).remove(0);

        let accepted = drive(&mut filter, &terms);
        let expected: Vec<u64> = terms
            .iter()
            .copied()
            .filter(|&t| {
                rect.contains_point(bits::morton_decode_lon(t), bits::morton_decode_lat(t))
            })
            .collect();
        assert_eq!(accepted, expected);
        assert!(!accepted.is_empty());
    }

    #[test]
    fn ranges_are_sorted_and_disjoint() {
        let filter = bbox_filters(GeoRect::new(-5.0, -3.0, 7.0, 9.0), 0.0).remove(0);
        assert!(filter.range_count() > 0);
        for pair in filter.ranges.windows(2) {
            assert!(pair[0].end < pair[1].start);
        }
        for range in &filter.ranges {
            assert!(range.start <= range.end);
        }
    }

    #[test]
    fn seek_floor_and_end() {
        let mut filter = bbox_filters(GeoRect::new(10.0, 10.0, 20.0, 20.0), 0.0).remove(0);
        let floor = filter.seek_floor().unwrap();

        // a term before the floor seeks forward
        match filter.accept(floor.saturating_sub(1000)) {
            AcceptStatus::NoAndSeek(target) => assert!(target >= floor),
            other => panic!("expected seek, got {other:?}"),
        }

        // a term past every range ends the enumeration
        assert_eq!(filter.accept(u64::MAX), AcceptStatus::End);
    }

    #[test]
    fn distance_filter_matches_haversine() {
        let (clat, clon, radius) = (40.0, -74.0, 250_000.0);
        let terms = term_grid(-80..-68, 34..46, 1.0);
        let filters = distance_filters(clat, clon, radius, 0.0);
        assert_eq!(filters.len(), 1);
        let mut filter = filters.into_iter().next().unwrap();

        let accepted = drive(&mut filter, &terms);
        let expected: Vec<u64> = terms
            .iter()
            .copied()
            .filter(|&t| {
                haversine(
                    clat,
                    clon,
                    bits::morton_decode_lat(t),
                    bits::morton_decode_lon(t),
                ) <= radius
            })
            .collect();
        assert_eq!(accepted, expected);
        assert!(!accepted.is_empty());
    }

    #[test]
    fn distance_query_splits_at_dateline() {
        let filters = distance_filters(0.0, 179.0, 321_869.0, 0.025);
        assert_eq!(filters.len(), 2, "dateline query splits in two");
        let west = filters[0].acceptor().bbox();
        let east = filters[1].acceptor().bbox();
        assert_eq!(west.min_lon, -180.0);
        assert!(west.max_lon < -178.0);
        assert!(east.min_lon > 176.0);
        assert_eq!(east.max_lon, 180.0);

        // the two filters together see both sides of the meridian
        let near_east = bits::morton_encode(179.5, 0.0);
        let near_west = bits::morton_encode(-179.5, 0.0);
        let mut matched = 0;
        for mut filter in filters {
            for &t in &[near_east.min(near_west), near_east.max(near_west)] {
                if filter.accept(t) == AcceptStatus::Yes {
                    matched += 1;
                }
            }
        }
        assert_eq!(matched, 2);
    }

    #[test]
    fn whole_world_radius_collapses_to_one_band() {
        let filters = distance_filters(0.0, 0.0, 30_000_000.0, 0.025);
        assert_eq!(filters.len(), 1);
        let bbox = filters[0].acceptor().bbox();
        assert_eq!((bbox.min_lon, bbox.max_lon), (-180.0, 180.0));
    }

    #[test]
    fn polygon_filter_matches_ray_cast() {
        let ring = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let terms = term_grid(-5..16, -5..16, 1.0);
        let mut filter = polygon_filter(ring.clone(), 0.0).unwrap();

        let accepted = drive(&mut filter, &terms);
        let expected: Vec<u64> = terms
            .iter()
            .copied()
            .filter(|&t| {
                point_in_polygon(
                    bits::morton_decode_lon(t),
                    bits::morton_decode_lat(t),
                    &ring,
                )
            })
            .collect();
        assert_eq!(accepted, expected);
        assert!(!accepted.is_empty());

        assert!(polygon_filter(vec![(0.0, 0.0), (1.0, 1.0)], 0.0).is_err());
    }

    #[test]
    fn distance_range_matches_annulus() {
        let (clat, clon) = (40.0, -74.0);
        let (lower, upper) = (80_000.0, 250_000.0);
        let terms = term_grid(-80..-68, 34..46, 1.0);
        let mut filter = distance_range_filters(clat, clon, lower, upper, 0.0)
            .unwrap()
            .remove(0);

        let accepted = drive(&mut filter, &terms);
        let expected: Vec<u64> = terms
            .iter()
            .copied()
            .filter(|&t| {
                let d = haversine(
                    clat,
                    clon,
                    bits::morton_decode_lat(t),
                    bits::morton_decode_lon(t),
                );
                d >= lower && d <= upper
            })
            .collect();
        assert_eq!(accepted, expected);
        assert!(!accepted.is_empty());

        // points inside the hole are rejected
        let center_term = bits::morton_encode(clon, clat);
        assert_ne!(filter.accept(center_term), AcceptStatus::Yes);

        assert!(distance_range_filters(0.0, 0.0, 100.0, 50.0, 0.0).is_err());
        assert!(distance_range_filters(0.0, 0.0, -1.0, 50.0, 0.0).is_err());
    }

    #[test]
    fn split_bbox_cases() {
        let plain = GeoRect::new(-10.0, -10.0, 10.0, 10.0);
        assert_eq!(split_bbox(plain), vec![plain]);

        let east_wrap = split_bbox(GeoRect::new(170.0, 0.0, 190.0, 10.0));
        assert_eq!(east_wrap.len(), 2);
        assert_eq!(
            east_wrap[0],
            GeoRect::new(-180.0, 0.0, -170.0, 10.0)
        );
        assert_eq!(east_wrap[1], GeoRect::new(170.0, 0.0, 180.0, 10.0));

        let west_wrap = split_bbox(GeoRect::new(-190.0, 0.0, -170.0, 10.0));
        assert_eq!(west_wrap.len(), 2);
        assert_eq!(west_wrap[0], GeoRect::new(-180.0, 0.0, -170.0, 10.0));
        assert_eq!(west_wrap[1], GeoRect::new(170.0, 0.0, 180.0, 10.0));

        let band = split_bbox(GeoRect::new(-250.0, 0.0, 250.0, 10.0));
        assert_eq!(band, vec![GeoRect::new(-180.0, 0.0, 180.0, 10.0)]);
    }

    #[test]
    fn slop_reduces_range_count() {
        let rect = GeoRect::new(-40.0, -40.0, 40.0, 40.0);
        let exact = bbox_filters(rect, 0.0).remove(0);
        let sloppy = bbox_filters(rect, 0.25).remove(0);
        assert!(sloppy.range_count() <= exact.range_count());
    }
}
