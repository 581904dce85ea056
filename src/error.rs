//! Error types for canopy analysis.

use thiserror::Error;

/// Main error type for canopy operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid CRS/geotransform, malformed growth table, bad parameters.
    /// Fatal for the image being processed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Polygon with fewer than three distinct points, or a mask with no pixels.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// Constant vegetation index, empty elevation mask and similar.
    #[error("numeric degeneracy: {0}")]
    NumericDegeneracy(String),

    #[error("raster shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch { expected: (usize, usize), actual: (usize, usize) },

    #[error("projection error: {0}")]
    Projection(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    #[inline]
    pub(crate) fn config(msg: impl Into<String>) -> Self { Self::Configuration(msg.into()) }
}

/// Result type alias for canopy operations.
pub type Result<T> = std::result::Result<T, Error>;
