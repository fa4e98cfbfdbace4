//! Detector frame data types.
//!
//! A [`DetectorFrame`] is the read-only input of every averaging engine:
//! a 2D intensity array indexed `[row, col]` (row = y pixel, col = x pixel),
//! an optional per-pixel error array, the detector geometry and the source
//! wavelength.

use crate::error::{Error, Result};
use crate::geometry::FrameGeometry;
use ndarray::Array2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A planar (x, y) pair in detector length units.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vector2 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
}

impl Vector2 {
    /// Creates a new vector.
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Geometry of one detector bank.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Detector {
    /// Physical size of one pixel (same units as `distance`).
    pub pixel_size: Vector2,
    /// Position of the direct beam on the detector (same units as `pixel_size`).
    pub beam_center: Vector2,
    /// Sample-to-detector distance.
    pub distance: f64,
}

impl Detector {
    /// Creates a detector description.
    #[must_use]
    pub fn new(pixel_size: Vector2, beam_center: Vector2, distance: f64) -> Self {
        Self {
            pixel_size,
            beam_center,
            distance,
        }
    }
}

/// Radiation source.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Source {
    /// Wavelength (inverse of the Q length unit).
    pub wavelength: f64,
}

impl Source {
    /// Creates a source with the given wavelength.
    #[must_use]
    pub fn new(wavelength: f64) -> Self {
        Self { wavelength }
    }
}

/// One detector frame: intensities, optional errors and instrument geometry.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectorFrame {
    /// Pixel intensities, indexed `[row, col]`.
    pub intensity: Array2<f64>,
    /// Per-pixel errors; `None` means "derive from intensity".
    pub error: Option<Array2<f64>>,
    /// Detector banks. Reduction supports exactly one.
    pub detectors: Vec<Detector>,
    /// Source description.
    pub source: Source,
}

impl DetectorFrame {
    /// Creates a single-detector frame without an error array.
    #[must_use]
    pub fn new(intensity: Array2<f64>, detector: Detector, source: Source) -> Self {
        Self {
            intensity,
            error: None,
            detectors: vec![detector],
            source,
        }
    }

    /// Attaches a per-pixel error array.
    #[must_use]
    pub fn with_error(mut self, error: Array2<f64>) -> Self {
        self.error = Some(error);
        self
    }

    /// Replaces the detector list.
    #[must_use]
    pub fn with_detectors(mut self, detectors: Vec<Detector>) -> Self {
        self.detectors = detectors;
        self
    }

    /// Number of pixel rows (y).
    #[must_use]
    pub fn rows(&self) -> usize {
        self.intensity.nrows()
    }

    /// Number of pixel columns (x).
    #[must_use]
    pub fn cols(&self) -> usize {
        self.intensity.ncols()
    }

    /// Total number of pixels.
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.intensity.len()
    }

    /// Returns the single detector, or an error if the frame has zero or several.
    pub fn detector(&self) -> Result<&Detector> {
        match self.detectors.as_slice() {
            [detector] => Ok(detector),
            other => Err(Error::InvalidDetectorCount(other.len())),
        }
    }

    /// Checks array shapes.
    pub fn validate(&self) -> Result<()> {
        if self.intensity.is_empty() {
            return Err(Error::EmptyFrame);
        }
        if let Some(error) = &self.error {
            if error.dim() != self.intensity.dim() {
                return Err(Error::ShapeMismatch {
                    intensity: self.intensity.dim(),
                    error: error.dim(),
                });
            }
        }
        Ok(())
    }

    /// Validates the frame and resolves its pixel-to-Q geometry.
    pub fn geometry(&self) -> Result<FrameGeometry> {
        self.validate()?;
        let detector = self.detector()?;
        FrameGeometry::new(detector, &self.source, self.rows(), self.cols())
    }

    /// Per-pixel variance used for error propagation.
    ///
    /// Falls back to `|I|` when there is no error array or the pixel error is
    /// exactly zero; otherwise `err²`.
    #[inline]
    #[must_use]
    pub fn variance(&self, row: usize, col: usize) -> f64 {
        let value = self.intensity[[row, col]];
        match &self.error {
            Some(error) if error[[row, col]] != 0.0 => {
                let err = error[[row, col]];
                err * err
            }
            _ => value.abs(),
        }
    }
}
