//! Geohash prefix tree.
//!
//! Cells are geohash strings; a cell's children append one base-32
//! character, so a parent token is a byte prefix of every descendant token
//! and string order is traversal order. The leaf marker is a trailing `+`
//! byte, which sorts before every alphabet character so a leaf precedes its
//! own (never emitted) subtree.

use crate::cell::Relation;
use crate::error::{Result, SpatialError};
use graticule_core::geohash::{self, BASE_32};
use graticule_core::rect::GeoRect;

/// Deepest geohash tree supported: tokens stay strings, but 24 characters
/// is already sub-millimetre.
pub const MAX_LEVELS_POSSIBLE: u32 = 24;

/// Byte appended to a token to mark a leaf cell.
pub const LEAF_BYTE: u8 = b'+';

/// Geohash decomposition of the world.
#[derive(Debug, Clone)]
pub struct GeohashTree {
    max_levels: u32,
}

impl GeohashTree {
    /// Create a tree `max_levels` deep, `1..=24`.
    pub fn new(max_levels: u32) -> Result<Self> {
        if max_levels == 0 || max_levels > MAX_LEVELS_POSSIBLE {
            return Err(SpatialError::invalid_config(format!(
                "geohash levels {max_levels} outside 1..={MAX_LEVELS_POSSIBLE}"
            )));
        }
        Ok(Self { max_levels })
    }

    pub fn max_levels(&self) -> u32 {
        self.max_levels
    }

    /// The level-0 cell: the empty hash, covering the whole plane.
    pub fn world_cell(&self) -> GeoHashCell {
        GeoHashCell {
            hash: String::new(),
            leaf: false,
            relation: None,
        }
    }

    pub(crate) fn cell(&self, hash: String) -> GeoHashCell {
        let leaf = hash.len() as u32 == self.max_levels;
        GeoHashCell {
            hash,
            leaf,
            relation: None,
        }
    }

    /// Decode an externally supplied token, with or without the trailing
    /// leaf byte.
    pub fn read_cell(&self, token: &[u8]) -> Result<GeoHashCell> {
        let (body, leaf) = match token.split_last() {
            Some((&LEAF_BYTE, body)) => (body, true),
            _ => (token, false),
        };
        if body.len() as u32 > self.max_levels {
            return Err(SpatialError::corrupt_term(format!(
                "token level {} exceeds tree depth {}",
                body.len(),
                self.max_levels
            )));
        }
        for &b in body {
            if !BASE_32.contains(&b) {
                return Err(SpatialError::corrupt_term(format!(
                    "token byte {:?} is not base-32",
                    b as char
                )));
            }
        }
        // validated as ASCII above
        let hash = String::from_utf8(body.to_vec()).expect("base-32 tokens are ASCII");
        let mut cell = self.cell(hash);
        cell.leaf |= leaf;
        Ok(cell)
    }

    /// The cell containing a point at the given level, by per-bit
    /// bisection. Shared-edge points resolve to the cell with
    /// `x ∈ [xmin, xmax)`, `y ∈ [ymin, ymax)`.
    pub fn cell_for(&self, lat: f64, lon: f64, level: u32) -> Result<GeoHashCell> {
        if level > self.max_levels {
            return Err(SpatialError::invalid_config(format!(
                "level {level} exceeds tree depth {}",
                self.max_levels
            )));
        }
        let (mut min_lon, mut max_lon) = (-180.0f64, 180.0f64);
        let (mut min_lat, mut max_lat) = (-90.0f64, 90.0f64);
        let mut split_lon = true;
        let mut hash = String::with_capacity(level as usize);
        for _ in 0..level {
            let mut idx = 0usize;
            for _ in 0..5 {
                idx <<= 1;
                if split_lon {
                    let mid = (min_lon + max_lon) / 2.0;
                    if lon >= mid {
                        idx |= 1;
                        min_lon = mid;
                    } else {
                        max_lon = mid;
                    }
                } else {
                    let mid = (min_lat + max_lat) / 2.0;
                    if lat >= mid {
                        idx |= 1;
                        min_lat = mid;
                    } else {
                        max_lat = mid;
                    }
                }
                split_lon = !split_lon;
            }
            hash.push(BASE_32[idx] as char);
        }
        Ok(self.cell(hash))
    }
}

/// One cell of a [`GeohashTree`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeoHashCell {
    hash: String,
    leaf: bool,
    relation: Option<Relation>,
}

impl GeoHashCell {
    /// The base-32 hash; empty for the world cell.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn level(&self) -> u32 {
        self.hash.len() as u32
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    pub fn set_leaf(&mut self) {
        self.leaf = true;
    }

    pub fn shape_relation(&self) -> Option<Relation> {
        self.relation
    }

    pub fn set_shape_relation(&mut self, relation: Relation) {
        self.relation = Some(relation);
    }

    /// Token bytes with the leaf marker appended when set.
    pub fn token_bytes_with_leaf(&self) -> Vec<u8> {
        let mut bytes = self.hash.as_bytes().to_vec();
        if self.leaf {
            bytes.push(LEAF_BYTE);
        }
        bytes
    }

    /// Token bytes without the leaf marker.
    pub fn token_bytes_no_leaf(&self) -> Vec<u8> {
        self.hash.as_bytes().to_vec()
    }

    /// Lexicographic comparison of the bare hashes.
    pub fn compare_no_leaf(&self, other: &GeoHashCell) -> std::cmp::Ordering {
        self.hash.as_bytes().cmp(other.hash.as_bytes())
    }

    /// The cell envelope.
    pub fn rectangle(&self) -> Result<GeoRect> {
        if self.hash.is_empty() {
            return Ok(GeoRect::WORLD);
        }
        geohash::bbox_of(&self.hash)
            .map_err(|e| SpatialError::corrupt_term(format!("bad cell hash: {e}")))
    }

    /// The 32 children in alphabet order; empty at max depth.
    pub fn sub_cells(&self, tree: &GeohashTree) -> Vec<GeoHashCell> {
        if self.level() >= tree.max_levels() {
            return Vec::new();
        }
        BASE_32
            .iter()
            .map(|&c| {
                let mut hash = String::with_capacity(self.hash.len() + 1);
                hash.push_str(&self.hash);
                hash.push(c as char);
                tree.cell(hash)
            })
            .collect()
    }
}
