//! Error types for graticule-core

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core codec error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed geohash string or packed value
    #[error("Invalid geohash: {0}")]
    InvalidGeohash(String),

    /// Unparseable coordinate text
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),
}

impl Error {
    /// Create an invalid-geohash error
    pub fn invalid_geohash(msg: impl Into<String>) -> Self {
        Error::InvalidGeohash(msg.into())
    }

    /// Create an invalid-coordinate error
    pub fn invalid_coordinate(msg: impl Into<String>) -> Self {
        Error::InvalidCoordinate(msg.into())
    }
}
