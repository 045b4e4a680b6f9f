//! # Graticule Spatial
//!
//! Prefix-tree spatial indexing core: turns shapes and points on WGS84
//! into lexicographically ordered byte terms for an inverted index, and
//! turns spatial predicates into iteration plans over those terms.
//!
//! # Architecture
//!
//! ```text
//! index time
//!   query shape ──► ShapeRelationOracle ──► StreamingCellIterator /
//!                                           RecursiveCellIterator
//!                                               │
//!                                               ▼
//!                                          Cell stream ──► CellTokens
//!                                               │
//!                                               ▼
//!                                     external index writer
//!
//! query time
//!   bbox / radius / polygon ──► GeoTermFilter ranges
//!                                    │
//!                                    ▼
//!                       accept / seek decisions over the
//!                       sorted Morton term iteration
//! ```
//!
//! The trees and their per-level metrics are immutable after construction
//! and shareable across threads; iterators and cells are thread-owned.
//! Iteration is synchronous and pull-driven, so back-pressure is the
//! consumer calling `next()`.
//!
//! # Modules
//!
//! - [`cell`]: cell capability surface and the tree/cell sum types
//! - [`quad`]: packed quad prefix tree, 64-bit cell terms
//! - [`geohash_tree`]: geohash prefix tree, string cell tokens
//! - [`oracle`]: shape-relation oracle seam (`geo`-backed default)
//! - [`strategy`]: streaming/recursive/term shape-to-cells iterators
//! - [`filters`]: Morton term-enumeration filters for bbox/distance/polygon
//! - [`indexer`]: shape-to-tokens facade over config + oracle + strategy
//! - [`config`]: per-field configuration and precision resolution
//! - [`reproject`]: CRS handler seam
//! - [`error`]: error types

pub mod cell;
pub mod config;
pub mod error;
pub mod filters;
pub mod geohash_tree;
pub mod indexer;
pub mod oracle;
pub mod quad;
pub mod reproject;
pub mod strategy;

pub use cell::{Cell, PrefixTree, Relation};
pub use config::{
    parse_distance, FieldConfig, Orientation, StrategyKind, TreeKind,
    DEFAULT_DISTANCE_ERROR_PCT, DEFAULT_PRECISION_METERS,
};
pub use error::{Result, SpatialError};
pub use filters::{
    bbox_filters, distance_filters, distance_range_filters, polygon_filter, AcceptStatus,
    BBoxAcceptor, DistanceAcceptor, DistanceRangeAcceptor, GeoTermFilter, PolygonAcceptor,
    TermAcceptor,
};
pub use geohash_tree::{GeoHashCell, GeohashTree};
pub use indexer::{IndexStats, IndexedShape, ShapeIndexer};
pub use oracle::{GeoShapeOracle, ShapeRelationOracle};
pub use quad::{PackedQuadCell, PackedQuadTree};
pub use reproject::{reproject_geometry, CrsHandler, IdentityCrs};
pub use strategy::{cells_for_shape, CellTokens, RecursiveCellIterator, StreamingCellIterator};
