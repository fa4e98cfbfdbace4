//! Error types for sasred-core.

use thiserror::Error;

/// Result type alias for sasred operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for Q-space reduction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The frame does not carry exactly one detector.
    #[error("invalid number of detectors: {0}")]
    InvalidDetectorCount(usize),

    /// Unrecognized slab major-axis selector.
    #[error("unrecognized axis: {0}")]
    UnknownAxis(String),

    /// Error array does not match the intensity array.
    #[error("error array shape {error:?} does not match intensity shape {intensity:?}")]
    ShapeMismatch {
        intensity: (usize, usize),
        error: (usize, usize),
    },

    /// Intensity array has no pixels.
    #[error("detector frame has no pixels")]
    EmptyFrame,

    /// Pixel size unusable as a divisor.
    #[error("invalid pixel size: ({x}, {y})")]
    InvalidPixelSize { x: f64, y: f64 },

    /// Non-physical instrument geometry.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// A pixel mapped to a bin outside the histogram.
    #[error("bin index {index} out of range [0, {nbins}) for pixel (row {row}, col {col})")]
    BinIndexOutOfRange {
        row: usize,
        col: usize,
        index: f64,
        nbins: usize,
    },
}
