//! CRS reprojection seam.
//!
//! The core never performs coordinate-reference-system math itself; an
//! external handler maps one coordinate at a time and this module walks it
//! over a geometry. Handler construction (projection databases, transform
//! pipelines) stays outside.

use crate::error::Result;
use geo::MapCoords;
use geo_types::{coord, Geometry};

/// One-coordinate reprojection supplied by the surrounding system.
pub trait CrsHandler {
    fn reproject(&self, x: f64, y: f64) -> Result<(f64, f64)>;
}

/// Handler that leaves coordinates untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCrs;

impl CrsHandler for IdentityCrs {
    fn reproject(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        Ok((x, y))
    }
}

/// Map every coordinate of a geometry through the handler. The first
/// handler failure aborts the walk.
pub fn reproject_geometry(
    geometry: &Geometry<f64>,
    handler: &dyn CrsHandler,
) -> Result<Geometry<f64>> {
    geometry.try_map_coords(|c| {
        handler
            .reproject(c.x, c.y)
            .map(|(x, y)| coord! { x: x, y: y })
    })
}
