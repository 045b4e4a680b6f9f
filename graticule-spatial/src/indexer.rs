//! Shape indexing facade.
//!
//! Bundles a field configuration, its prefix tree, and the default oracle
//! into the one call an ingest pipeline needs: shape in, ordered token
//! bytes out. Consumers that want to stream cells without materialising
//! use [`crate::strategy`] directly.

use crate::config::FieldConfig;
use crate::error::Result;
use crate::oracle::GeoShapeOracle;
use crate::strategy::cells_for_shape;
use crate::cell::PrefixTree;
use geo_types::Geometry;

/// Counters collected while indexing one shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Cells emitted, interior and leaf.
    pub cells: u64,

    /// Leaf cells among them.
    pub leaves: u64,

    /// Deepest level reached.
    pub deepest_level: u32,
}

/// Tokens and stats for one indexed shape.
#[derive(Debug, Clone)]
pub struct IndexedShape {
    /// Token bytes in emission order, leaf flags folded in.
    pub tokens: Vec<Vec<u8>>,

    pub stats: IndexStats,
}

/// Reusable indexer for one configured field.
///
/// The tree is built once; `index_shape` may be called from many threads
/// on the same indexer since nothing here mutates.
pub struct ShapeIndexer {
    config: FieldConfig,
    tree: PrefixTree,
}

impl ShapeIndexer {
    pub fn new(config: FieldConfig) -> Result<Self> {
        let tree = config.build_tree()?;
        Ok(Self { config, tree })
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn tree(&self) -> &PrefixTree {
        &self.tree
    }

    /// Cover the shape with the configured strategy and collect the token
    /// stream for the index writer.
    pub fn index_shape(&self, shape: Geometry<f64>) -> Result<IndexedShape> {
        let oracle = GeoShapeOracle::new(shape)?;
        let mut stats = IndexStats::default();
        let mut tokens = Vec::new();
        for cell in cells_for_shape(&self.tree, &oracle, self.config.strategy)? {
            let cell = cell?;
            stats.cells += 1;
            if cell.is_leaf() {
                stats.leaves += 1;
            }
            stats.deepest_level = stats.deepest_level.max(cell.level());
            tokens.push(cell.token_bytes_with_leaf());
        }
        tracing::debug!(
            cells = stats.cells,
            leaves = stats.leaves,
            deepest = stats.deepest_level,
            "indexed shape"
        );
        Ok(IndexedShape { tokens, stats })
    }
}
