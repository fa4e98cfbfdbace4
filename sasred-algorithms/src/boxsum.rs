//! Sum and average of counts in a rectangular Q region.

use crate::slab::{axis_cells, SlabAxis};
use crate::sweep::{sweep_columns, BinAccumulator, SweepOptions};
use sasred_core::{BoxResult, DetectorFrame, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rectangular region of interest [1/length].
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BoxConfig {
    /// Minimum Qx.
    pub x_min: f64,
    /// Maximum Qx.
    pub x_max: f64,
    /// Minimum Qy.
    pub y_min: f64,
    /// Maximum Qy.
    pub y_max: f64,
}

impl BoxConfig {
    /// Creates a box from its Qx and Qy ranges.
    #[must_use]
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }
}

fn accumulate(
    config: &BoxConfig,
    frame: &DetectorFrame,
    options: SweepOptions,
) -> Result<BinAccumulator> {
    let geometry = frame.geometry()?;
    let columns = axis_cells(&geometry, SlabAxis::X, config.x_min, config.x_max, false);
    let rows = axis_cells(&geometry, SlabAxis::Y, config.y_min, config.y_max, false);

    let acc = sweep_columns(geometry.cols(), 1, options, |col, acc| {
        let frac_x = columns[col].frac;
        if frac_x == 0.0 {
            return Ok(());
        }
        for (row, cell) in rows.iter().enumerate() {
            let frac = frac_x * cell.frac;
            if frac == 0.0 {
                continue;
            }
            acc.add(0, frac, frame.intensity[[row, col]], frame.variance(row, col));
        }
        Ok(())
    })?;

    let (_, _, weight) = acc.totals(0);
    log::debug!("box {config:?}: accumulated weight {weight}");
    Ok(acc)
}

/// Sum of counts inside a box.
#[derive(Clone, Debug, Default)]
pub struct BoxSum {
    config: BoxConfig,
    options: SweepOptions,
}

impl BoxSum {
    /// Create with the given region.
    #[must_use]
    pub fn new(config: BoxConfig) -> Self {
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

    /// Get the region.
    #[must_use]
    pub fn config(&self) -> &BoxConfig {
        &self.config
    }

    /// Returns the summed counts and `sqrt` of the summed variance, or zeros
    /// when no pixel overlaps the box.
    pub fn sum(&self, frame: &DetectorFrame) -> Result<BoxResult> {
        let acc = accumulate(&self.config, frame, self.options)?;
        let (sum, variance, weight) = acc.totals(0);
        if weight == 0.0 {
            return Ok(BoxResult::default());
        }
        Ok(BoxResult {
            value: sum,
            error: variance.sqrt(),
            weight,
        })
    }
}

/// Average of counts inside a box.
#[derive(Clone, Debug, Default)]
pub struct BoxAverage {
    config: BoxConfig,
    options: SweepOptions,
}

impl BoxAverage {
    /// Create with the given region.
    #[must_use]
    pub fn new(config: BoxConfig) -> Self {
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

    /// Get the region.
    #[must_use]
    pub fn config(&self) -> &BoxConfig {
        &self.config
    }

    /// Returns the weighted mean and its error, or zeros when no pixel
    /// overlaps the box.
    pub fn average(&self, frame: &DetectorFrame) -> Result<BoxResult> {
        let acc = accumulate(&self.config, frame, self.options)?;
        let (sum, variance, weight) = acc.totals(0);
        if weight == 0.0 {
            return Ok(BoxResult::default());
        }
        Ok(BoxResult {
            value: sum / weight,
            error: variance.sqrt() / weight,
            weight,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;
    use sasred_core::{Detector, Source, Vector2};

    fn frame() -> DetectorFrame {
        let mut intensity = Array2::from_elem((8, 8), 4.0);
        intensity[[4, 4]] = 16.0;
        DetectorFrame::new(
            intensity,
            Detector::new(Vector2::new(1.0, 1.0), Vector2::new(4.0, 4.0), 1000.0),
            Source::new(6.0),
        )
    }

    #[test]
    fn test_whole_detector_box() {
        let roi = BoxConfig::new(-1.0, 1.0, -1.0, 1.0);
        let sum = BoxSum::new(roi.clone()).sum(&frame()).unwrap();
        assert_relative_eq!(sum.weight, 64.0);
        assert_relative_eq!(sum.value, 63.0 * 4.0 + 16.0);
        // Variance falls back to |I|.
        assert_relative_eq!(sum.error, (63.0_f64 * 4.0 + 16.0).sqrt());

        let avg = BoxAverage::new(roi).average(&frame()).unwrap();
        assert_relative_eq!(avg.value, sum.value / 64.0);
        assert_relative_eq!(avg.error, sum.error / 64.0);
    }

    #[test]
    fn test_half_pixel_box() {
        let geometry = frame().geometry().unwrap();
        // Box covering only the inner half of the pixel just right of/above the beam.
        let q_mid = geometry.axis_q(0.5);
        let q_edge = geometry.axis_q(1.0);
        let roi = BoxConfig::new(q_mid, q_edge, 0.0, geometry.axis_q(1.0));
        let sum = BoxSum::new(roi).sum(&frame()).unwrap();
        assert_relative_eq!(sum.weight, (q_edge - q_mid) / q_edge, max_relative = 1e-12);
        assert_relative_eq!(sum.value, 16.0 * sum.weight, max_relative = 1e-12);
    }

    #[test]
    fn test_box_outside_detector() {
        let roi = BoxConfig::new(5.0, 6.0, 5.0, 6.0);
        let sum = BoxSum::new(roi.clone()).sum(&frame()).unwrap();
        assert_eq!(sum, BoxResult::default());
        let avg = BoxAverage::new(roi).average(&frame()).unwrap();
        assert_eq!(avg.as_pair(), (0.0, 0.0));
    }
}
