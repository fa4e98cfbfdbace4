//! Circular (azimuthal) averaging: isotropic I(Q).

use crate::sweep::{bin_count, sweep_columns, upper_edge_bin, SweepOptions};
use crate::Averager;
use sasred_core::{DetectorFrame, Reduced1D, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Annulus for circular averaging [1/length].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CircularConfig {
    /// Minimum radius included in the average.
    pub r_min: f64,
    /// Maximum radius included in the average.
    pub r_max: f64,
    /// Bin width (step size).
    pub bin_width: f64,
}

impl Default for CircularConfig {
    fn default() -> Self {
        Self {
            r_min: 0.0,
            r_max: 0.0,
            bin_width: 0.0005,
        }
    }
}

impl CircularConfig {
    /// Creates a configuration for the annulus `[r_min, r_max]`.
    #[must_use]
    pub fn new(r_min: f64, r_max: f64) -> Self {
        Self {
            r_min,
            r_max,
            ..Self::default()
        }
    }

    /// Sets the bin width.
    #[must_use]
    pub fn with_bin_width(mut self, width: f64) -> Self {
        self.bin_width = width;
        self
    }
}

/// Circular averager.
///
/// The Q axis runs from `r_min` up to the Q of the detector corner farthest
/// from the beam; only the part of each pixel inside `[r_min, r_max]` is
/// counted.
#[derive(Clone, Debug, Default)]
pub struct CircularAverage {
    config: CircularConfig,
    options: SweepOptions,
}

impl CircularAverage {
    /// Create with custom configuration.
    #[must_use]
    pub fn new(config: CircularConfig) -> Self {
        Self {
            config,
            options: SweepOptions::default(),
        }
    }

    /// Set execution options.
    #[must_use]
    pub fn with_options(mut self, options: SweepOptions) -> Self {
        self.options = options;
        self
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &CircularConfig {
        &self.config
    }

    /// Perform circular averaging on the frame.
    pub fn average(&self, frame: &DetectorFrame) -> Result<Reduced1D> {
        let geometry = frame.geometry()?;
        let CircularConfig {
            r_min,
            r_max,
            bin_width,
        } = self.config;

        let q_max = geometry.max_q();
        let nbins = bin_count(q_max - r_min, bin_width)?;
        log::debug!("circular average: q_max {q_max}, {nbins} bins of {bin_width}");

        let acc = sweep_columns(geometry.cols(), nbins, self.options, |col, acc| {
            for row in 0..geometry.rows() {
                let pixel = geometry.pixel(row, col);
                let frac = pixel.annulus_fraction(r_min, r_max);
                if frac == 0.0 {
                    continue;
                }
                let Some(bin) = upper_edge_bin(pixel.q, r_min, bin_width, nbins) else {
                    continue;
                };
                acc.add(bin, frac, frame.intensity[[row, col]], frame.variance(row, col));
                acc.set_x(bin, pixel.q);
            }
            Ok(())
        })?;

        Ok(acc.finish())
    }
}

impl Averager for CircularAverage {
    fn name(&self) -> &'static str {
        "CircularAverage"
    }

    fn average(&self, frame: &DetectorFrame) -> Result<Reduced1D> {
        CircularAverage::average(self, frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;
    use sasred_core::{Detector, Error, Source, Vector2};

    fn detector() -> Detector {
        Detector::new(Vector2::new(1.0, 1.0), Vector2::new(3.0, 3.0), 1000.0)
    }

    #[test]
    fn test_config_defaults() {
        let config = CircularConfig::default();
        assert!((config.bin_width - 0.0005).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_multiple_detectors() {
        let frame = DetectorFrame::new(Array2::ones((6, 6)), detector(), Source::new(6.0))
            .with_detectors(vec![detector(), detector()]);
        let err = CircularAverage::new(CircularConfig::new(0.0, 1.0))
            .average(&frame)
            .unwrap_err();
        assert_eq!(err, Error::InvalidDetectorCount(2));
    }

    #[test]
    fn test_annulus_excludes_inner_pixels() {
        let frame = DetectorFrame::new(Array2::ones((6, 6)), detector(), Source::new(6.0));
        let geometry = frame.geometry().unwrap();
        // Inner radius at the far corners of the four central pixels.
        let r_min = geometry.q(1.0, 1.0);
        let config = CircularConfig::new(r_min, 1.0).with_bin_width(geometry.max_q() / 4.0);
        let profile = CircularAverage::new(config).average(&frame).unwrap();
        // The pixel touching the beam from above-right lies fully inside r_min.
        assert!(profile.total_weight() < 35.0);
        for point in profile.points() {
            assert_relative_eq!(point.y, 1.0, max_relative = 1e-12);
        }
    }
}
