//! Shape-to-cells iterators.
//!
//! Three ways to turn a query shape into the cell stream the index writer
//! consumes:
//!
//! - [`StreamingCellIterator`]: navigates packed quad terms in place with
//!   `next_cell`, never materialising the tree. One cell of lookahead,
//!   restart-safe, each cell visited at most once.
//! - [`RecursiveCellIterator`]: explicit stack over sub-cells; works for
//!   both tree kinds. In covering mode it emits interior cells as well; in
//!   leaves mode it emits only the leaf cover.
//! - [`CellTokens`]: adapts any cell stream to token bytes with the leaf
//!   flag folded in.

use crate::cell::{Cell, PrefixTree, Relation};
use crate::config::StrategyKind;
use crate::error::{Result, SpatialError};
use crate::oracle::ShapeRelationOracle;
use crate::quad::{PackedQuadCell, PackedQuadTree};

/// Streaming minimal-cover iterator over a packed quad tree.
///
/// Disjoint subtrees are skipped with `next_cell(false)`; cells entirely
/// within the shape are emitted as leaves and their subtrees skipped the
/// same way; everything else is emitted and descended into. An oracle
/// failure ends the stream after surfacing the error.
pub struct StreamingCellIterator<'a, O: ShapeRelationOracle> {
    tree: &'a PackedQuadTree,
    oracle: &'a O,
    current: Option<PackedQuadCell>,
    pending: Option<PackedQuadCell>,
}

impl<'a, O: ShapeRelationOracle> StreamingCellIterator<'a, O> {
    pub fn new(tree: &'a PackedQuadTree, oracle: &'a O) -> Self {
        Self {
            tree,
            oracle,
            current: tree.world_cell().next_cell(tree, true),
            pending: None,
        }
    }

    fn advance(&mut self) -> Result<()> {
        while let Some(mut cur) = self.current {
            let rect = self.tree.rectangle_of(&cur);
            match self.oracle.relate(&rect)? {
                Relation::Disjoint => {
                    self.current = cur.next_cell(self.tree, false);
                }
                rel @ (Relation::Intersects | Relation::Contains) => {
                    cur.set_shape_relation(rel);
                    if cur.level() == self.tree.max_levels() {
                        cur.set_leaf();
                    }
                    self.current = cur.next_cell(self.tree, true);
                    self.pending = Some(cur);
                    return Ok(());
                }
                Relation::Within => {
                    cur.set_leaf();
                    cur.set_shape_relation(Relation::Within);
                    self.current = cur.next_cell(self.tree, false);
                    self.pending = Some(cur);
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

impl<O: ShapeRelationOracle> Iterator for StreamingCellIterator<'_, O> {
    type Item = Result<PackedQuadCell>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pending.is_none() {
            if let Err(e) = self.advance() {
                self.current = None;
                return Some(Err(e));
            }
        }
        self.pending.take().map(Ok)
    }
}

/// Stack-driven cover iterator over either tree kind.
pub struct RecursiveCellIterator<'a, O: ShapeRelationOracle> {
    tree: &'a PrefixTree,
    oracle: &'a O,
    stack: Vec<Cell>,
    emit_interior: bool,
}

impl<'a, O: ShapeRelationOracle> RecursiveCellIterator<'a, O> {
    /// Emit every non-disjoint cell: interior cells plus leaves.
    pub fn covering(tree: &'a PrefixTree, oracle: &'a O) -> Result<Self> {
        Self::new(tree, oracle, true)
    }

    /// Emit only the leaf cover.
    pub fn leaves(tree: &'a PrefixTree, oracle: &'a O) -> Result<Self> {
        Self::new(tree, oracle, false)
    }

    fn new(tree: &'a PrefixTree, oracle: &'a O, emit_interior: bool) -> Result<Self> {
        let mut stack = tree.sub_cells(&tree.world_cell())?;
        stack.reverse();
        Ok(Self {
            tree,
            oracle,
            stack,
            emit_interior,
        })
    }

    fn step(&mut self) -> Result<Option<Cell>> {
        while let Some(mut cell) = self.stack.pop() {
            let rect = self.tree.rectangle(&cell)?;
            let rel = self.oracle.relate(&rect)?;
            match rel {
                Relation::Disjoint => continue,
                Relation::Within => {
                    cell.set_leaf();
                    cell.set_shape_relation(Relation::Within);
                    return Ok(Some(cell));
                }
                rel if cell.level() == self.tree.max_levels() => {
                    cell.set_leaf();
                    cell.set_shape_relation(rel);
                    return Ok(Some(cell));
                }
                rel => {
                    let mut subs = self.tree.sub_cells(&cell)?;
                    subs.reverse();
                    self.stack.extend(subs);
                    if self.emit_interior {
                        cell.set_shape_relation(rel);
                        return Ok(Some(cell));
                    }
                }
            }
        }
        Ok(None)
    }
}

impl<O: ShapeRelationOracle> Iterator for RecursiveCellIterator<'_, O> {
    type Item = Result<Cell>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(cell) => cell.map(Ok),
            Err(e) => {
                self.stack.clear();
                Some(Err(e))
            }
        }
    }
}

/// Adapter from a cell stream to the token byte stream handed to the index
/// writer. Each token carries the leaf flag.
pub struct CellTokens<I> {
    inner: I,
}

impl<I> CellTokens<I> {
    pub fn new(inner: I) -> Self {
        Self { inner }
    }
}

impl<I: Iterator<Item = Result<Cell>>> Iterator for CellTokens<I> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|cell| cell.map(|c| c.token_bytes_with_leaf()))
    }
}

/// Instantiate the configured strategy as a cell stream.
///
/// The streaming strategy is defined over packed quad navigation and
/// rejects a geohash tree.
pub fn cells_for_shape<'a, O: ShapeRelationOracle>(
    tree: &'a PrefixTree,
    oracle: &'a O,
    strategy: StrategyKind,
) -> Result<Box<dyn Iterator<Item = Result<Cell>> + 'a>> {
    tracing::debug!(?strategy, levels = tree.max_levels(), "building cell stream");
    match strategy {
        StrategyKind::Streaming => match tree {
            PrefixTree::Quad(quad) => Ok(Box::new(
                StreamingCellIterator::new(quad, oracle).map(|r| r.map(Cell::Quad)),
            )),
            PrefixTree::Geohash(_) => Err(SpatialError::invalid_config(
                "streaming strategy requires the quadtree",
            )),
        },
        StrategyKind::Recursive => Ok(Box::new(RecursiveCellIterator::covering(tree, oracle)?)),
        StrategyKind::Term => Ok(Box::new(RecursiveCellIterator::leaves(tree, oracle)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::GeoShapeOracle;
    use crate::quad::PackedQuadTree;
    use geo_types::{polygon, Geometry};
    use graticule_core::rect::GeoRect;
    use rustc_hash::FxHashSet;

    fn rect_shape(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Geometry<f64> {
        Geometry::Polygon(polygon![
            (x: min_lon, y: min_lat),
            (x: max_lon, y: min_lat),
            (x: max_lon, y: max_lat),
            (x: min_lon, y: max_lat),
            (x: min_lon, y: min_lat),
        ])
    }

    fn collect_streaming(
        tree: &PackedQuadTree,
        oracle: &GeoShapeOracle,
    ) -> Vec<PackedQuadCell> {
        StreamingCellIterator::new(tree, oracle)
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn streaming_covers_rectangle() {
        let tree = PackedQuadTree::new(5).unwrap();
        let query = GeoRect::new(-10.0, -10.0, 10.0, 10.0);
        let oracle =
            GeoShapeOracle::new(rect_shape(-10.0, -10.0, 10.0, 10.0)).unwrap();
        let cells = collect_streaming(&tree, &oracle);
        assert!(!cells.is_empty());

        // every emitted cell overlaps the shape; leaves that are Within lie
        // fully inside it
        for cell in &cells {
            let rect = tree.rectangle_of(cell);
            assert!(rect.intersects(&query));
            if cell.shape_relation() == Some(Relation::Within) {
                assert!(query.contains_rect(&rect));
                assert!(cell.is_leaf());
            }
        }

        // the leaf union covers the query: sample points inside the query
        // must fall in some leaf
        let leaves: Vec<GeoRect> = cells
            .iter()
            .filter(|c| c.is_leaf())
            .map(|c| tree.rectangle_of(c))
            .collect();
        let mut lat = -9.5;
        while lat < 10.0 {
            let mut lon = -9.5;
            while lon < 10.0 {
                assert!(
                    leaves.iter().any(|r| r.contains_point(lon, lat)),
                    "({lon}, {lat}) uncovered"
                );
                lon += 1.0;
            }
            lat += 1.0;
        }
    }

    #[test]
    fn streaming_stream_structure() {
        let tree = PackedQuadTree::new(4).unwrap();
        let oracle = GeoShapeOracle::new(rect_shape(3.0, 3.0, 40.0, 40.0)).unwrap();
        let cells = collect_streaming(&tree, &oracle);

        // no duplicates
        let mut seen = FxHashSet::default();
        for cell in &cells {
            assert!(seen.insert(cell.term()), "duplicate {:#x}", cell.term());
        }

        // pre-order: every non-leaf is immediately followed by cells from
        // its own subtree until a cell outside it appears, and a cell never
        // precedes its ancestor
        for pair in cells.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if b.level() > a.level() {
                let shift = 2 * (b.level() - a.level());
                assert_eq!(b.term() >> shift, a.term(), "child follows its parent");
            }
            // cells at the same level appear in ascending token order
            if b.level() == a.level() {
                assert!(a.term() < b.term());
            }
        }
    }

    #[test]
    fn streaming_restart_is_identical() {
        let tree = PackedQuadTree::new(4).unwrap();
        let oracle = GeoShapeOracle::new(rect_shape(-100.0, 10.0, -60.0, 55.0)).unwrap();
        let first = collect_streaming(&tree, &oracle);
        let second = collect_streaming(&tree, &oracle);
        assert_eq!(first, second);
    }

    #[test]
    fn streaming_leaf_subtree_is_skipped() {
        let tree = PackedQuadTree::new(4).unwrap();
        // the whole NE level-1 cell is inside the shape, so no cell below
        // it may be emitted
        let oracle = GeoShapeOracle::new(rect_shape(-1.0, -1.0, 180.0, 90.0)).unwrap();
        let cells = collect_streaming(&tree, &oracle);
        let ne = tree.cell_for(45.0, 90.0, 1).unwrap();
        let within_ne: Vec<_> = cells
            .iter()
            .filter(|c| {
                c.level() > 1 && (c.term() >> (2 * (c.level() - 1))) == ne.term()
            })
            .collect();
        let ne_emitted = cells.iter().find(|c| c.term() == ne.term()).unwrap();
        assert_eq!(ne_emitted.shape_relation(), Some(Relation::Within));
        assert!(ne_emitted.is_leaf());
        assert!(within_ne.is_empty(), "leaf subtree must be skipped");
    }

    #[test]
    fn recursive_and_streaming_agree_on_leaves() {
        let quad = PackedQuadTree::new(4).unwrap();
        let tree = PrefixTree::Quad(quad.clone());
        let oracle = GeoShapeOracle::new(rect_shape(-20.0, -15.0, 33.0, 8.0)).unwrap();

        let streaming_leaves: FxHashSet<u64> = collect_streaming(&quad, &oracle)
            .into_iter()
            .filter(|c| c.is_leaf())
            .map(|c| c.term())
            .collect();

        let term_leaves: FxHashSet<u64> = RecursiveCellIterator::leaves(&tree, &oracle)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap()
            .into_iter()
            .map(|c| match c {
                Cell::Quad(q) => q.term(),
                Cell::Geohash(_) => unreachable!("quad tree emits quad cells"),
            })
            .collect();

        assert_eq!(streaming_leaves, term_leaves);
    }

    #[test]
    fn recursive_covering_emits_interior_cells() {
        let tree = PrefixTree::Quad(PackedQuadTree::new(3).unwrap());
        let oracle = GeoShapeOracle::new(rect_shape(10.0, 10.0, 20.0, 20.0)).unwrap();
        let cells: Vec<Cell> = RecursiveCellIterator::covering(&tree, &oracle)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        let leaves: Vec<Cell> = RecursiveCellIterator::leaves(&tree, &oracle)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert!(cells.len() > leaves.len());
        assert!(cells.iter().any(|c| !c.is_leaf()));
        assert!(leaves.iter().all(|c| c.is_leaf()));
    }

    #[test]
    fn geohash_term_strategy_covers_point() {
        let tree = PrefixTree::Geohash(crate::geohash_tree::GeohashTree::new(5).unwrap());
        let point = Geometry::Point(geo_types::Point::new(2.3522, 48.8566));
        let oracle = GeoShapeOracle::new(point).unwrap();
        let cells: Vec<Cell> = RecursiveCellIterator::leaves(&tree, &oracle)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        // a point reaches max depth in exactly one cell per level path
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].level(), 5);
        let rect = tree.rectangle(&cells[0]).unwrap();
        assert!(rect.contains_point(2.3522, 48.8566));
    }

    #[test]
    fn streaming_rejects_geohash_tree() {
        let tree = PrefixTree::Geohash(crate::geohash_tree::GeohashTree::new(4).unwrap());
        let oracle = GeoShapeOracle::new(rect_shape(0.0, 0.0, 1.0, 1.0)).unwrap();
        assert!(matches!(
            cells_for_shape(&tree, &oracle, StrategyKind::Streaming),
            Err(SpatialError::InvalidConfig(_))
        ));
    }

    #[test]
    fn token_adapter_folds_leaf_flag() {
        let tree = PrefixTree::Quad(PackedQuadTree::new(3).unwrap());
        let oracle = GeoShapeOracle::new(rect_shape(-170.0, -80.0, 170.0, 80.0)).unwrap();
        let iter = cells_for_shape(&tree, &oracle, StrategyKind::Term).unwrap();
        let tokens: Vec<Vec<u8>> = CellTokens::new(iter)
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert!(!tokens.is_empty());
        for token in &tokens {
            assert_eq!(token.len(), 8);
            assert_eq!(token[7] & 0x1, 0x1, "leaf bit folded into the token");
        }
    }
}
