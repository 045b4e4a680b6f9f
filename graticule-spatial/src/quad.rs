//! Packed quad prefix tree.
//!
//! The lat/lon plane is decomposed into quad cells addressed by a single
//! `u64` term. Reading the term MSB-first: leading zeros, a sentinel `1`
//! marking the top of the address, one 2-bit quadrant per level, and a leaf
//! flag in the LSB. The world cell is the literal `0x2` (sentinel, no
//! quadrants, leaf clear).
//!
//! Quadrants follow Z-order with the origin at the cell centre:
//! `00 = NW, 01 = NE, 10 = SW, 11 = SE`.
//!
//! Because the sentinel moves two bits higher per level, descending is
//! `term << 2 | quad << 1` and the next sibling is `term + 0x2`. The level
//! of any term is recovered from the sentinel position alone:
//! `((64 - leading_zeros) >> 1) - 1`.
//!
//! Encoded tokens are the 8 big-endian bytes of the term, so byte order and
//! numeric order agree, which is what the inverted-index term dictionary
//! needs.

use crate::cell::Relation;
use crate::error::{Result, SpatialError};
use graticule_core::rect::GeoRect;

/// Deepest tree supported by the 64-bit term layout: 31 quadrant pairs plus
/// sentinel and leaf bits.
pub const MAX_LEVELS_POSSIBLE: u32 = 31;

/// The world cell term: sentinel only.
const WORLD_TERM: u64 = 0x2;

/// The all-SE term at `level` with a clear leaf bit; the last cell the
/// traversal visits at that depth.
fn end_term(level: u32) -> u64 {
    if level >= MAX_LEVELS_POSSIBLE {
        // (1 << 64) - 2 without the shift wrapping
        u64::MAX - 1
    } else {
        (1u64 << ((level << 1) + 2)) - 2
    }
}

/// Quad decomposition of the world rectangle with per-level metrics.
///
/// Immutable after construction; shareable across threads.
#[derive(Debug, Clone)]
pub struct PackedQuadTree {
    max_levels: u32,
    /// `level_w[i]` is the width in degrees of a level-`i` cell;
    /// `level_w[0]` is the world width.
    level_w: Vec<f64>,
    level_h: Vec<f64>,
}

impl PackedQuadTree {
    /// Create a tree `max_levels` deep, `1..=31`.
    pub fn new(max_levels: u32) -> Result<Self> {
        if max_levels == 0 || max_levels > MAX_LEVELS_POSSIBLE {
            return Err(SpatialError::invalid_config(format!(
                "quadtree levels {max_levels} outside 1..={MAX_LEVELS_POSSIBLE}"
            )));
        }
        let mut level_w = Vec::with_capacity(max_levels as usize + 1);
        let mut level_h = Vec::with_capacity(max_levels as usize + 1);
        let (mut w, mut h) = (GeoRect::WORLD.width(), GeoRect::WORLD.height());
        for _ in 0..=max_levels {
            level_w.push(w);
            level_h.push(h);
            w /= 2.0;
            h /= 2.0;
        }
        Ok(Self {
            max_levels,
            level_w,
            level_h,
        })
    }

    pub fn max_levels(&self) -> u32 {
        self.max_levels
    }

    /// The level-0 cell covering the whole plane.
    pub fn world_cell(&self) -> PackedQuadCell {
        self.cell(WORLD_TERM)
    }

    /// Wrap a term produced by navigation, folding in the forced-leaf rule
    /// at max depth.
    pub(crate) fn cell(&self, term: u64) -> PackedQuadCell {
        let mut cell = PackedQuadCell {
            term,
            leaf: term & 0x1 == 0x1,
            relation: None,
        };
        if cell.level() == self.max_levels {
            cell.leaf = true;
        }
        cell
    }

    /// Decode an externally supplied 8-byte token.
    pub fn read_cell(&self, token: &[u8]) -> Result<PackedQuadCell> {
        let bytes: [u8; 8] = token.try_into().map_err(|_| {
            SpatialError::corrupt_term(format!("token is {} bytes, expected 8", token.len()))
        })?;
        let term = u64::from_be_bytes(bytes);
        if term == 0 {
            return Err(SpatialError::corrupt_term("no sentinel bit set"));
        }
        // a valid sentinel sits at an odd bit position
        let high_bit = 63 - term.leading_zeros();
        if high_bit & 1 == 0 {
            return Err(SpatialError::corrupt_term(format!(
                "sentinel at even bit {high_bit} in term {term:#x}"
            )));
        }
        let level = ((64 - term.leading_zeros()) >> 1) - 1;
        if level > self.max_levels {
            return Err(SpatialError::corrupt_term(format!(
                "term level {level} exceeds tree depth {}",
                self.max_levels
            )));
        }
        Ok(self.cell(term))
    }

    /// The cell containing a point at the given level.
    ///
    /// Shared-edge points resolve by the lower-left rule: a cell holds
    /// `x ∈ [xmin, xmax)`, `y ∈ [ymin, ymax)`.
    pub fn cell_for(&self, lat: f64, lon: f64, level: u32) -> Result<PackedQuadCell> {
        if level > self.max_levels {
            return Err(SpatialError::invalid_config(format!(
                "level {level} exceeds tree depth {}",
                self.max_levels
            )));
        }
        let mut term = WORLD_TERM;
        let (mut cx, mut cy) = (0.0f64, 0.0f64);
        for l in 1..=level {
            let east = lon >= cx;
            let north = lat >= cy;
            let quad: u64 = match (north, east) {
                (true, false) => 0,  // NW
                (true, true) => 1,   // NE
                (false, false) => 2, // SW
                (false, true) => 3,  // SE
            };
            term = (term << 2) | (quad << 1);
            let (hw, hh) = (
                self.level_w[l as usize] / 2.0,
                self.level_h[l as usize] / 2.0,
            );
            cx += if east { hw } else { -hw };
            cy += if north { hh } else { -hh };
        }
        Ok(self.cell(term))
    }

    /// Materialise the cell's rectangle by walking the quadrant pairs from
    /// the top of the term.
    pub fn rectangle_of(&self, cell: &PackedQuadCell) -> GeoRect {
        let level = cell.level();
        let (mut xmin, mut ymin) = (GeoRect::WORLD.min_lon, GeoRect::WORLD.min_lat);
        for depth in 1..=level {
            let shift = 2 * (level - depth) + 1;
            let quad = (cell.term >> shift) & 0x3;
            let (w, h) = (self.level_w[depth as usize], self.level_h[depth as usize]);
            match quad {
                0x0 => ymin += h,
                0x1 => {
                    xmin += w;
                    ymin += h;
                }
                0x2 => {}
                _ => xmin += w,
            }
        }
        let (w, h) = (
            self.level_w[level as usize],
            self.level_h[level as usize],
        );
        GeoRect::new(xmin, ymin, xmin + w, ymin + h)
    }
}

/// One cell of a [`PackedQuadTree`]: a term plus leaf flag and the relation
/// recorded against the query shape during iteration.
///
/// Cells are plain values; navigation methods take the owning tree
/// explicitly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackedQuadCell {
    term: u64,
    leaf: bool,
    relation: Option<Relation>,
}

impl PackedQuadCell {
    /// The raw 64-bit term.
    pub fn term(&self) -> u64 {
        self.term
    }

    /// Level from the sentinel position.
    pub fn level(&self) -> u32 {
        debug_assert!(self.term != 0, "term has no sentinel");
        ((64 - self.term.leading_zeros()) >> 1) - 1
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    /// Mark this cell a leaf: its subtree is covered.
    pub fn set_leaf(&mut self) {
        self.leaf = true;
    }

    pub fn shape_relation(&self) -> Option<Relation> {
        self.relation
    }

    pub fn set_shape_relation(&mut self, relation: Relation) {
        self.relation = Some(relation);
    }

    /// Token bytes with the leaf flag folded into the LSB.
    pub fn token_bytes_with_leaf(&self) -> [u8; 8] {
        let term = if self.leaf { self.term | 0x1 } else { self.term };
        term.to_be_bytes()
    }

    /// Token bytes with the leaf flag stripped.
    pub fn token_bytes_no_leaf(&self) -> [u8; 8] {
        (self.term & !0x1).to_be_bytes()
    }

    /// Lexicographic comparison of the leaf-stripped tokens.
    pub fn compare_no_leaf(&self, other: &PackedQuadCell) -> std::cmp::Ordering {
        self.token_bytes_no_leaf().cmp(&other.token_bytes_no_leaf())
    }

    /// True when the leaf-stripped term is the all-SE path at `level`.
    pub fn is_end(&self, level: u32) -> bool {
        let base = self.term & !0x1;
        base != WORLD_TERM && base == end_term(level)
    }

    /// The next cell in the depth-first traversal.
    ///
    /// With `descend` the traversal steps into the NW child; otherwise (or
    /// on a leaf, or at max depth) it moves to the next sibling, ascending
    /// to the nearest ancestor that still has one. Returns `None` once the
    /// traversal is exhausted. A leaf flag on the term is stripped before
    /// the sibling arithmetic, so leaf-marked interior cells navigate like
    /// their clean form.
    pub fn next_cell(&self, tree: &PackedQuadTree, descend: bool) -> Option<PackedQuadCell> {
        let level = self.level();
        if (!descend && self.is_end(level)) || self.is_end(tree.max_levels()) {
            return None;
        }

        let leaf_bit = self.term & 0x1 == 0x1;
        let new_term = if (descend && !leaf_bit && level != tree.max_levels()) || level == 0 {
            self.term << 2
        } else {
            let mut t = (self.term & !0x1) + 0x2;
            // last sibling: the carry ran into the parent pair, realign the
            // sentinel onto the ancestor's next sibling
            if self.term & 0x6 == 0x6 {
                let tz = t.trailing_zeros();
                t >>= tz - if tz & 1 == 0 { 2 } else { 1 };
            }
            t
        };
        Some(tree.cell(new_term))
    }

    /// The four children in Z-order; empty at max depth.
    pub fn sub_cells(&self, tree: &PackedQuadTree) -> Vec<PackedQuadCell> {
        if self.level() >= tree.max_levels() {
            return Vec::new();
        }
        (0u64..4)
            .map(|quad| tree.cell(((self.term & !0x1) << 2) | (quad << 1)))
            .collect()
    }
}
