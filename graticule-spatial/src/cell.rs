//! Cell capability surface shared by both prefix trees.
//!
//! The index writer only ever sees [`Cell`] values: token bytes, level,
//! leaf flag, and the relation recorded against the query shape. The two
//! concrete kinds are tagged variants rather than a class hierarchy.

use crate::error::{Result, SpatialError};
use crate::geohash_tree::{GeoHashCell, GeohashTree};
use crate::quad::{PackedQuadCell, PackedQuadTree};
use graticule_core::rect::GeoRect;
use std::cmp::Ordering;

/// Relation of a cell rectangle to the query shape.
///
/// The names read cell-first: `Within` means the cell lies entirely inside
/// the shape; `Contains` means the cell contains the shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Disjoint,
    Intersects,
    Within,
    Contains,
}

impl Relation {
    /// Swap the two asymmetric relations, flipping which side is "within".
    pub fn transpose(self) -> Relation {
        match self {
            Relation::Within => Relation::Contains,
            Relation::Contains => Relation::Within,
            other => other,
        }
    }

    /// Everything except `Disjoint` overlaps.
    pub fn intersects(self) -> bool {
        !matches!(self, Relation::Disjoint)
    }
}

/// A cell of either tree kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Quad(PackedQuadCell),
    Geohash(GeoHashCell),
}

impl Cell {
    pub fn level(&self) -> u32 {
        match self {
            Cell::Quad(c) => c.level(),
            Cell::Geohash(c) => c.level(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        match self {
            Cell::Quad(c) => c.is_leaf(),
            Cell::Geohash(c) => c.is_leaf(),
        }
    }

    pub fn set_leaf(&mut self) {
        match self {
            Cell::Quad(c) => c.set_leaf(),
            Cell::Geohash(c) => c.set_leaf(),
        }
    }

    pub fn shape_relation(&self) -> Option<Relation> {
        match self {
            Cell::Quad(c) => c.shape_relation(),
            Cell::Geohash(c) => c.shape_relation(),
        }
    }

    pub fn set_shape_relation(&mut self, relation: Relation) {
        match self {
            Cell::Quad(c) => c.set_shape_relation(relation),
            Cell::Geohash(c) => c.set_shape_relation(relation),
        }
    }

    /// Token bytes with the leaf flag folded in.
    pub fn token_bytes_with_leaf(&self) -> Vec<u8> {
        match self {
            Cell::Quad(c) => c.token_bytes_with_leaf().to_vec(),
            Cell::Geohash(c) => c.token_bytes_with_leaf(),
        }
    }

    /// Token bytes with the leaf flag stripped.
    pub fn token_bytes_no_leaf(&self) -> Vec<u8> {
        match self {
            Cell::Quad(c) => c.token_bytes_no_leaf().to_vec(),
            Cell::Geohash(c) => c.token_bytes_no_leaf(),
        }
    }

    /// Lexicographic comparison of the leaf-stripped tokens. Cells of
    /// different kinds compare by their raw bytes; mixing kinds in one
    /// field is a caller error.
    pub fn compare_no_leaf(&self, other: &Cell) -> Ordering {
        match (self, other) {
            (Cell::Quad(a), Cell::Quad(b)) => a.compare_no_leaf(b),
            (Cell::Geohash(a), Cell::Geohash(b)) => a.compare_no_leaf(b),
            _ => self.token_bytes_no_leaf().cmp(&other.token_bytes_no_leaf()),
        }
    }
}

/// A prefix tree of either kind; the single handle query and index code
/// passes around.
#[derive(Debug, Clone)]
pub enum PrefixTree {
    Quad(PackedQuadTree),
    Geohash(GeohashTree),
}

impl PrefixTree {
    pub fn max_levels(&self) -> u32 {
        match self {
            PrefixTree::Quad(t) => t.max_levels(),
            PrefixTree::Geohash(t) => t.max_levels(),
        }
    }

    /// The level-0 cell covering the whole plane.
    pub fn world_cell(&self) -> Cell {
        match self {
            PrefixTree::Quad(t) => Cell::Quad(t.world_cell()),
            PrefixTree::Geohash(t) => Cell::Geohash(t.world_cell()),
        }
    }

    /// The cell containing a point at the given level.
    pub fn cell_for(&self, lat: f64, lon: f64, level: u32) -> Result<Cell> {
        match self {
            PrefixTree::Quad(t) => t.cell_for(lat, lon, level).map(Cell::Quad),
            PrefixTree::Geohash(t) => t.cell_for(lat, lon, level).map(Cell::Geohash),
        }
    }

    /// Decode an externally supplied token.
    pub fn read_cell(&self, token: &[u8]) -> Result<Cell> {
        match self {
            PrefixTree::Quad(t) => t.read_cell(token).map(Cell::Quad),
            PrefixTree::Geohash(t) => t.read_cell(token).map(Cell::Geohash),
        }
    }

    /// The cell's rectangle.
    pub fn rectangle(&self, cell: &Cell) -> Result<GeoRect> {
        match (self, cell) {
            (PrefixTree::Quad(t), Cell::Quad(c)) => Ok(t.rectangle_of(c)),
            (PrefixTree::Geohash(_), Cell::Geohash(c)) => c.rectangle(),
            _ => Err(SpatialError::TreeMismatch),
        }
    }

    /// The cell's children in token order.
    pub fn sub_cells(&self, cell: &Cell) -> Result<Vec<Cell>> {
        match (self, cell) {
            (PrefixTree::Quad(t), Cell::Quad(c)) => {
                Ok(c.sub_cells(t).into_iter().map(Cell::Quad).collect())
            }
            (PrefixTree::Geohash(t), Cell::Geohash(c)) => {
                Ok(c.sub_cells(t).into_iter().map(Cell::Geohash).collect())
            }
            _ => Err(SpatialError::TreeMismatch),
        }
    }
}
