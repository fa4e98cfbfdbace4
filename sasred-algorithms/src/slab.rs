//! Slab averaging: I(Qx) or I(Qy) over a rectangular Q window.
//!
//! The major axis is binned; the minor axis is integrated over. Partial
//! pixels at the window edges are weighted by the fraction of their Q extent
//! inside the window.

use crate::sweep::{bin_count, sweep_columns, upper_edge_bin, SweepOptions};
use crate::Averager;
use sasred_core::geometry::FrameGeometry;
use sasred_core::{edge_fraction, DetectorFrame, Error, Reduced1D, Result};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Axis along which a slab is binned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SlabAxis {
    /// Bin along Qx, integrate over Qy.
    X,
    /// Bin along Qy, integrate over Qx.
    Y,
}

impl FromStr for SlabAxis {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" | "qx" => Ok(Self::X),
            "y" | "qy" => Ok(Self::Y),
            other => Err(Error::UnknownAxis(other.to_string())),
        }
    }
}

impl fmt::Display for SlabAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => f.write_str("x"),
            Self::Y => f.write_str("y"),
        }
    }
}

/// Slab region of interest [1/length].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SlabConfig {
    /// Minimum Qx.
    pub x_min: f64,
    /// Maximum Qx.
    pub x_max: f64,
    /// Minimum Qy.
    pub y_min: f64,
    /// Maximum Qy.
    pub y_max: f64,
    /// Bin width along the major axis.
    pub bin_width: f64,
    /// Return I(|Q|) instead of allowing negative Q.
    pub fold: bool,
}

impl Default for SlabConfig {
    fn default() -> Self {
        Self {
            x_min: 0.0,
            x_max: 0.0,
            y_min: 0.0,
            y_max: 0.0,
            bin_width: 0.001,
            fold: false,
        }
    }
}

impl SlabConfig {
    /// Creates a slab configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the Qx window.
    #[must_use]
    pub fn with_x_range(mut self, min: f64, max: f64) -> Self {
        self.x_min = min;
        self.x_max = max;
        self
    }

    /// Sets the Qy window.
    #[must_use]
    pub fn with_y_range(mut self, min: f64, max: f64) -> Self {
        self.y_min = min;
        self.y_max = max;
        self
    }

    /// Sets the bin width.
    #[must_use]
    pub fn with_bin_width(mut self, width: f64) -> Self {
        self.bin_width = width;
        self
    }

    /// Sets folding of negative Q.
    #[must_use]
    pub fn with_fold(mut self, fold: bool) -> Self {
        self.fold = fold;
        self
    }
}

/// One pixel row or column projected on its Q axis.
#[derive(Clone, Copy, Debug)]
pub(crate) struct AxisCell {
    /// Fraction of the pixel's Q extent inside the window.
    pub frac: f64,
    /// Q at the pixel centre (sign kept unless folded).
    pub q: f64,
}

/// Projects every column (`SlabAxis::X`) or row (`SlabAxis::Y`) of the frame on its
/// Q axis and weighs it against `[lo, hi]`.
pub(crate) fn axis_cells(
    geometry: &FrameGeometry,
    axis: SlabAxis,
    lo: f64,
    hi: f64,
    fold: bool,
) -> Vec<AxisCell> {
    let count = match axis {
        SlabAxis::X => geometry.cols(),
        SlabAxis::Y => geometry.rows(),
    };
    (0..count)
        .map(|index| {
            let ((edge_lo, edge_hi), offset) = match axis {
                SlabAxis::X => (geometry.x_edges(index), geometry.x_offset(index)),
                SlabAxis::Y => (geometry.y_edges(index), geometry.y_offset(index)),
            };
            let q_lo = geometry.axis_q(edge_lo);
            let q_hi = geometry.axis_q(edge_hi);
            let frac = edge_fraction(hi, q_lo, q_hi) - edge_fraction(lo, q_lo, q_hi);

            let q = geometry.axis_q(offset);
            AxisCell {
                frac,
                q: if fold { q.abs() } else { q },
            }
        })
        .collect()
}

/// Slab averager along one axis.
#[derive(Clone, Debug)]
pub struct Slab {
    config: SlabConfig,
    axis: SlabAxis,
    options: SweepOptions,
}

impl Slab {
    /// Create a slab averager for the given axis.
    #[must_use]
    pub fn new(config: SlabConfig, axis: SlabAxis) -> Self {
        Self {
            config,
            axis,
            options: SweepOptions::default(),
        }
    }

    /// I(Qx) averager.
    #[must_use]
    pub fn x(config: SlabConfig) -> Self {
        Self::new(config, SlabAxis::X)
    }

    /// I(Qy) averager.
    #[must_use]
    pub fn y(config: SlabConfig) -> Self {
        Self::new(config, SlabAxis::Y)
    }

    /// Set execution options.
    #[must_use]
    pub fn with_options(mut self, options: SweepOptions) -> Self {
        self.options = options;
        self
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &SlabConfig {
        &self.config
    }

    /// Get the major axis.
    #[must_use]
    pub fn axis(&self) -> SlabAxis {
        self.axis
    }

    /// Compute I(Q_major) for the region of interest.
    pub fn average(&self, frame: &DetectorFrame) -> Result<Reduced1D> {
        let geometry = frame.geometry()?;
        let cfg = &self.config;

        let (major_min, major_max) = match self.axis {
            SlabAxis::X => (cfg.x_min, cfg.x_max),
            SlabAxis::Y => (cfg.y_min, cfg.y_max),
        };
        // Folded Q is never negative, so the axis starts at zero.
        let start = if cfg.fold { 0.0 } else { major_min };
        let nbins = bin_count(major_max - start, cfg.bin_width)?;
        log::debug!(
            "slab {}: {nbins} bins from {start} (width {}, fold {})",
            self.axis,
            cfg.bin_width,
            cfg.fold
        );

        let columns = axis_cells(&geometry, SlabAxis::X, cfg.x_min, cfg.x_max, cfg.fold);
        let rows = axis_cells(&geometry, SlabAxis::Y, cfg.y_min, cfg.y_max, cfg.fold);
        let axis = self.axis;
        let bin_width = cfg.bin_width;

        let acc = sweep_columns(geometry.cols(), nbins, self.options, |col, acc| {
            let column = columns[col];
            if column.frac == 0.0 {
                return Ok(());
            }
            for (row, cell) in rows.iter().enumerate() {
                let frac = column.frac * cell.frac;
                if frac == 0.0 {
                    continue;
                }
                let q_value = match axis {
                    SlabAxis::X => column.q,
                    SlabAxis::Y => cell.q,
                };
                let Some(bin) = upper_edge_bin(q_value, start, bin_width, nbins) else {
                    continue;
                };
                acc.add(bin, frac, frame.intensity[[row, col]], frame.variance(row, col));
                acc.set_x(bin, q_value);
            }
            Ok(())
        })?;

        Ok(acc.finish())
    }
}

impl Averager for Slab {
    fn name(&self) -> &'static str {
        match self.axis {
            SlabAxis::X => "SlabX",
            SlabAxis::Y => "SlabY",
        }
    }

    fn average(&self, frame: &DetectorFrame) -> Result<Reduced1D> {
        Slab::average(self, frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slab_config_defaults() {
        let config = SlabConfig::default();
        assert!((config.bin_width - 0.001).abs() < f64::EPSILON);
        assert!(!config.fold);
    }

    #[test]
    fn test_axis_parse() {
        assert_eq!("x".parse::<SlabAxis>().unwrap(), SlabAxis::X);
        assert_eq!("Qy".parse::<SlabAxis>().unwrap(), SlabAxis::Y);
        assert_eq!(
            "z".parse::<SlabAxis>().unwrap_err(),
            Error::UnknownAxis("z".into())
        );
    }

    #[test]
    fn test_slab_builders() {
        let config = SlabConfig::new()
            .with_x_range(-0.01, 0.01)
            .with_y_range(-0.002, 0.002)
            .with_bin_width(0.0005)
            .with_fold(true);
        let slab = Slab::y(config.clone());
        assert_eq!(slab.axis(), SlabAxis::Y);
        assert_eq!(slab.config(), &config);
        assert_eq!(slab.name(), "SlabY");
    }
}
