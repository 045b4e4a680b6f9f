//! Field configuration for spatial indexing.
//!
//! A field picks a prefix tree, an indexing strategy, and a depth. Depth
//! can be given directly as `tree_levels` or derived from a precision in
//! meters ("50m", "2km"), in which case the precision wins.

use crate::cell::PrefixTree;
use crate::error::{Result, SpatialError};
use crate::geohash_tree::{self, GeohashTree};
use crate::quad::{self, PackedQuadTree};
use graticule_core::distance::{EARTH_EQUATOR, EARTH_POLAR_DISTANCE};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which prefix tree decomposes the plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeKind {
    Geohash,
    Quadtree,
}

impl TreeKind {
    pub fn max_levels(self) -> u32 {
        match self {
            TreeKind::Geohash => geohash_tree::MAX_LEVELS_POSSIBLE,
            TreeKind::Quadtree => quad::MAX_LEVELS_POSSIBLE,
        }
    }
}

impl FromStr for TreeKind {
    type Err = SpatialError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "geohash" => Ok(TreeKind::Geohash),
            "quadtree" => Ok(TreeKind::Quadtree),
            other => Err(SpatialError::invalid_config(format!(
                "unknown tree [{other}]"
            ))),
        }
    }
}

/// Which iterator turns shapes into cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Leaf cover only.
    Term,
    /// Stack-driven cover, interior cells included.
    Recursive,
    /// On-the-fly packed quad navigation.
    Streaming,
}

impl FromStr for StrategyKind {
    type Err = SpatialError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "term" => Ok(StrategyKind::Term),
            "recursive" => Ok(StrategyKind::Recursive),
            "streaming" => Ok(StrategyKind::Streaming),
            other => Err(SpatialError::invalid_config(format!(
                "unknown strategy [{other}]"
            ))),
        }
    }
}

/// Polygon winding interpretation, consumed by the shape parsing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Clockwise outer rings.
    Left,
    /// Counter-clockwise outer rings.
    Right,
}

impl FromStr for Orientation {
    type Err = SpatialError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "left" | "cw" | "clockwise" => Ok(Orientation::Left),
            "right" | "ccw" | "counterclockwise" => Ok(Orientation::Right),
            other => Err(SpatialError::invalid_config(format!(
                "unknown orientation [{other}]"
            ))),
        }
    }
}

/// Default slop fraction for query covers.
pub const DEFAULT_DISTANCE_ERROR_PCT: f64 = 0.025;

/// Default precision when neither levels nor precision is configured.
pub const DEFAULT_PRECISION_METERS: f64 = 50.0;

/// Per-field spatial configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub tree: TreeKind,
    pub strategy: StrategyKind,
    /// Explicit depth; overridden by `precision_meters` when both are set.
    pub tree_levels: Option<u32>,
    pub precision_meters: Option<f64>,
    pub distance_error_pct: f64,
    pub orientation: Orientation,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            tree: TreeKind::Geohash,
            strategy: StrategyKind::Recursive,
            tree_levels: None,
            precision_meters: None,
            distance_error_pct: DEFAULT_DISTANCE_ERROR_PCT,
            orientation: Orientation::Right,
        }
    }
}

impl FieldConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree(mut self, tree: TreeKind) -> Self {
        self.tree = tree;
        self
    }

    pub fn strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn tree_levels(mut self, levels: u32) -> Self {
        self.tree_levels = Some(levels);
        self
    }

    /// Set depth from a distance-with-unit string ("50m", "2km", "1mi").
    pub fn precision(mut self, distance: &str) -> Result<Self> {
        self.precision_meters = Some(parse_distance(distance)?);
        Ok(self)
    }

    pub fn precision_meters(mut self, meters: f64) -> Self {
        self.precision_meters = Some(meters);
        self
    }

    pub fn distance_error_pct(mut self, pct: f64) -> Self {
        self.distance_error_pct = pct;
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Check option ranges without building anything.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=0.5).contains(&self.distance_error_pct) {
            return Err(SpatialError::invalid_config(format!(
                "distance_error_pct {} outside [0, 0.5]",
                self.distance_error_pct
            )));
        }
        if let Some(levels) = self.tree_levels {
            let cap = self.tree.max_levels();
            if levels == 0 || levels > cap {
                return Err(SpatialError::invalid_config(format!(
                    "tree_levels {levels} outside 1..={cap}"
                )));
            }
        }
        if let Some(meters) = self.precision_meters {
            if !(meters > 0.0) {
                return Err(SpatialError::invalid_config(format!(
                    "precision {meters}m is not positive"
                )));
            }
        }
        Ok(())
    }

    /// Depth after applying the precision override and the default
    /// precision fallback.
    pub fn resolved_levels(&self) -> u32 {
        if let Some(meters) = self.precision_meters {
            return levels_for_precision(self.tree, meters);
        }
        self.tree_levels
            .unwrap_or_else(|| levels_for_precision(self.tree, DEFAULT_PRECISION_METERS))
    }

    /// Build the configured prefix tree.
    pub fn build_tree(&self) -> Result<PrefixTree> {
        self.validate()?;
        let levels = self.resolved_levels();
        Ok(match self.tree {
            TreeKind::Geohash => PrefixTree::Geohash(GeohashTree::new(levels)?),
            TreeKind::Quadtree => PrefixTree::Quad(PackedQuadTree::new(levels)?),
        })
    }
}

/// Parse a distance-with-unit string into meters. A bare number is meters.
pub fn parse_distance(s: &str) -> Result<f64> {
    let s = s.trim();
    // longest suffix first so "m" does not shadow "km"
    const UNITS: &[(&str, f64)] = &[
        ("nmi", 1_852.0),
        ("km", 1_000.0),
        ("cm", 0.01),
        ("mm", 0.001),
        ("mi", 1_609.344),
        ("yd", 0.9144),
        ("ft", 0.3048),
        ("in", 0.0254),
        ("m", 1.0),
    ];
    let (number, factor) = UNITS
        .iter()
        .find_map(|&(suffix, factor)| s.strip_suffix(suffix).map(|n| (n, factor)))
        .unwrap_or((s, 1.0));
    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| SpatialError::invalid_config(format!("cannot parse distance [{s}]")))?;
    if !(value > 0.0) {
        return Err(SpatialError::invalid_config(format!(
            "distance [{s}] is not positive"
        )));
    }
    Ok(value * factor)
}

/// Cell dimensions in meters at the equator for a geohash level.
fn geohash_cell_meters(level: u32) -> (f64, f64) {
    let lon_bits = (5 * level).div_ceil(2);
    let lat_bits = (5 * level) / 2;
    let w = EARTH_EQUATOR / (1u64 << lon_bits) as f64;
    let h = EARTH_POLAR_DISTANCE / (1u64 << lat_bits) as f64;
    (w, h)
}

/// Cell dimensions in meters at the equator for a quadtree level.
fn quadtree_cell_meters(level: u32) -> (f64, f64) {
    let w = EARTH_EQUATOR / (1u64 << level) as f64;
    let h = EARTH_POLAR_DISTANCE / (1u64 << level) as f64;
    (w, h)
}

fn levels_for(cap: u32, meters: f64, cell: impl Fn(u32) -> (f64, f64)) -> u32 {
    if !(meters > 0.0) {
        return cap;
    }
    for level in 1..=cap {
        let (w, h) = cell(level);
        if w.hypot(h) <= meters {
            return level;
        }
    }
    cap
}

/// Smallest geohash level whose cell diagonal is at most `meters`.
pub fn geohash_levels_for_precision(meters: f64) -> u32 {
    levels_for(
        geohash_tree::MAX_LEVELS_POSSIBLE,
        meters,
        geohash_cell_meters,
    )
}

/// Smallest quadtree level whose cell diagonal is at most `meters`.
pub fn quadtree_levels_for_precision(meters: f64) -> u32 {
    levels_for(quad::MAX_LEVELS_POSSIBLE, meters, quadtree_cell_meters)
}

/// Dispatch on the tree kind.
pub fn levels_for_precision(tree: TreeKind, meters: f64) -> u32 {
    match tree {
        TreeKind::Geohash => geohash_levels_for_precision(meters),
        TreeKind::Quadtree => quadtree_levels_for_precision(meters),
    }
}
