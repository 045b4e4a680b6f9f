//! # Graticule Core
//!
//! Runtime-agnostic geo primitives for the graticule indexing core.
//!
//! This crate provides:
//! - Bit-interleaving and Morton (Z-order) codecs over WGS84 coordinates
//! - Geohash base-32 string and packed-long codecs
//! - `GeoPoint` / `GeoRect` value types
//! - Haversine distance and rectangle/circle relation predicates
//!
//! ## Design Principles
//!
//! 1. **Pure codecs**: bit operations are infallible; coordinate range
//!    violations are caller contract, not runtime errors
//! 2. **Value types**: points and rectangles are `Copy`; no interior mutation
//! 3. **No geometry library**: exact shape predicates live upstream in
//!    `graticule-spatial`, behind the oracle seam

pub mod bits;
pub mod distance;
pub mod error;
pub mod geohash;
pub mod point;
pub mod rect;

pub use error::{Error, Result};
pub use geohash::Decoded;
pub use point::GeoPoint;
pub use rect::GeoRect;
