//! Shape-relation oracle seam.
//!
//! The trees never inspect query geometry themselves; they ask an oracle
//! how a cell rectangle relates to the shape. The default oracle is backed
//! by the `geo` crate's DE-9IM predicates, but anything implementing
//! [`ShapeRelationOracle`] plugs in, which keeps the planar-geometry engine
//! swappable.

use crate::cell::Relation;
use crate::error::{Result, SpatialError};
use geo::{Relate, Validation};
use geo_types::{coord, Geometry, Polygon, Rect};
use graticule_core::rect::GeoRect;

/// Relation of a cell rectangle to the query shape, cell-first: `Within`
/// means the rectangle lies inside the shape.
pub trait ShapeRelationOracle {
    fn relate(&self, rect: &GeoRect) -> Result<Relation>;
}

/// Default oracle over a `geo-types` geometry.
///
/// Geometry validity is checked once at construction; [`relate`] itself
/// cannot fail after that.
///
/// [`relate`]: ShapeRelationOracle::relate
pub struct GeoShapeOracle {
    shape: Geometry<f64>,
}

impl GeoShapeOracle {
    pub fn new(shape: Geometry<f64>) -> Result<Self> {
        if !shape.is_valid() {
            return Err(SpatialError::invalid_shape(
                "geometry fails validity rules (self-intersection or malformed rings)",
            ));
        }
        Ok(Self { shape })
    }

    pub fn shape(&self) -> &Geometry<f64> {
        &self.shape
    }
}

fn to_polygon(rect: &GeoRect) -> Polygon<f64> {
    Rect::new(
        coord! { x: rect.min_lon, y: rect.min_lat },
        coord! { x: rect.max_lon, y: rect.max_lat },
    )
    .to_polygon()
}

impl ShapeRelationOracle for GeoShapeOracle {
    fn relate(&self, rect: &GeoRect) -> Result<Relation> {
        let cell = to_polygon(rect);
        let matrix = cell.relate(&self.shape);
        let relation = if matrix.is_disjoint() {
            Relation::Disjoint
        } else if matrix.is_contains() {
            Relation::Contains
        } else if matrix.is_within() {
            Relation::Within
        } else {
            Relation::Intersects
        };
        Ok(relation)
    }
}
