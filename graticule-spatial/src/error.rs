//! Error types for the spatial indexing core.

use thiserror::Error;

/// Result type for spatial operations.
pub type Result<T> = std::result::Result<T, SpatialError>;

/// Spatial indexing errors.
#[derive(Error, Debug)]
pub enum SpatialError {
    /// Unknown tree/strategy name or out-of-range option.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Query geometry does not satisfy the geometry library's validity
    /// rules. Iteration aborts on this.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// A token that cannot be a cell of this tree: no sentinel bit,
    /// sentinel in an even position, or a level past the tree depth.
    #[error("Corrupt cell term: {0}")]
    CorruptTerm(String),

    /// A cell was handed to a tree of the other kind.
    #[error("Cell does not belong to this tree")]
    TreeMismatch,

    /// Codec-level error from graticule-core.
    #[error("Codec error: {0}")]
    Codec(#[from] graticule_core::Error),
}

impl SpatialError {
    /// Create an invalid-configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        SpatialError::InvalidConfig(msg.into())
    }

    /// Create an invalid-shape error.
    pub fn invalid_shape(msg: impl Into<String>) -> Self {
        SpatialError::InvalidShape(msg.into())
    }

    /// Create a corrupt-term error.
    pub fn corrupt_term(msg: impl Into<String>) -> Self {
        SpatialError::CorruptTerm(msg.into())
    }
}
