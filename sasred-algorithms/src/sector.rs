//! Sector averaging: I(phi) or I(Q) inside an angular wedge.
//!
//! One engine covers the three sector reductions; [`SectorMode`] selects the
//! wedge membership test, the bin-index formula and the output x axis while
//! the pixel sweep and accumulation are shared.
//!
//! Angles follow `phi = atan2(dy, dx) + π`, i.e. `phi ∈ [0, 2π]` counted
//! anti-clockwise from the negative x axis. `phi_max < phi_min` denotes a
//! wedge wrapping through zero.
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use crate::sweep::{bin_centres, sweep_columns, SweepOptions};
use crate::Averager;
use rayon::prelude::*;
use sasred_core::geometry::FrameGeometry;
use sasred_core::{flip_phi, DetectorFrame, Error, Reduced1D, Result};
use std::f64::consts::{PI, TAU};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which quantity a sector average is binned by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SectorMode {
    /// I(phi): bin by azimuth, integrate over Q.
    Phi,
    /// I(Q): bin by Q, integrate over the wedge.
    Q,
    /// I(Q) over the wedge and its mirror image rotated by π.
    SymmetricQ,
}

impl SectorMode {
    fn bins_q(self) -> bool {
        matches!(self, Self::Q | Self::SymmetricQ)
    }
}

impl FromStr for SectorMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "phi" => Ok(Self::Phi),
            "q" => Ok(Self::Q),
            "q2" | "symmetric" => Ok(Self::SymmetricQ),
            other => Err(Error::ConfigError(format!("unknown sector mode: {other}"))),
        }
    }
}

impl fmt::Display for SectorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Phi => f.write_str("phi"),
            Self::Q => f.write_str("q"),
            Self::SymmetricQ => f.write_str("q2"),
        }
    }
}

/// Sector region of interest.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SectorConfig {
    /// Minimum radius [1/length].
    pub r_min: f64,
    /// Maximum radius [1/length].
    pub r_max: f64,
    /// Wedge start angle [rad].
    ///
    /// Expected in `[-2π, 2π]`. A start above 2π is not folded back: pixels
    /// with `phi < phi_min - 2π` fall before bin 0 and the average fails with
    /// [`Error::BinIndexOutOfRange`].
    pub phi_min: f64,
    /// Wedge end angle [rad].
    pub phi_max: f64,
    /// Number of output bins.
    pub nbins: usize,
    /// Logarithm base for Q bins; `None` bins linearly. Ignored in phi mode.
    ///
    /// Bin `i` holds `floor(n·ln(q/q_lo)/ln(q_max/q_lo)) == i`, where `q_lo`
    /// is `r_min`, or `1e-4` when `r_min` is not positive. Any valid base gives
    /// the same bins.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub base: Option<f64>,
}

impl Default for SectorConfig {
    fn default() -> Self {
        Self {
            r_min: 0.0,
            r_max: 0.0,
            phi_min: 0.0,
            phi_max: TAU,
            nbins: 20,
            base: None,
        }
    }
}

impl SectorConfig {
    /// Creates a sector over the annulus `[r_min, r_max]` and wedge
    /// `[phi_min, phi_max]`.
    #[must_use]
    pub fn new(r_min: f64, r_max: f64, phi_min: f64, phi_max: f64) -> Self {
        Self {
            r_min,
            r_max,
            phi_min,
            phi_max,
            ..Self::default()
        }
    }

    /// Sets the number of bins.
    #[must_use]
    pub fn with_nbins(mut self, nbins: usize) -> Self {
        self.nbins = nbins;
        self
    }

    /// Bins Q logarithmically in the given base.
    #[must_use]
    pub fn with_base(mut self, base: f64) -> Self {
        self.base = Some(base);
        self
    }
}

/// Lower Q bound of a logarithmic axis when `r_min` is not positive.
const LOG_Q_FLOOR: f64 = 1e-4;

/// Geometric bin centres of `nbins` logarithmic bins from `start`, where
/// `ratio = ln(end / start)`.
fn log_bin_centres(start: f64, ratio: f64, nbins: usize) -> Vec<f64> {
    let step = ratio / nbins as f64;
    (0..nbins)
        .map(|i| start * (step * (i as f64 + 0.5)).exp())
        .collect()
}

/// Normalized wedge, optionally with its π-rotated mirror.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Wedge {
    phi_min: f64,
    phi_max: f64,
    mirror: Option<(f64, f64)>,
}

impl Wedge {
    fn new(config: &SectorConfig, symmetric: bool) -> Self {
        let phi_min = config.phi_min;
        let mut phi_max = config.phi_max;
        // Only phi_max is ever shifted, including when phi_min is negative.
        if phi_max > TAU {
            phi_max -= TAU;
        }
        if phi_min < 0.0 {
            phi_max += TAU;
        }
        let mirror = symmetric.then(|| (flip_phi(phi_min - PI), flip_phi(phi_max - PI)));
        Self {
            phi_min,
            phi_max,
            mirror,
        }
    }

    fn wraps(&self) -> bool {
        self.phi_min > self.phi_max
    }

    fn contains(&self, phi: f64) -> bool {
        let in_mirror = self.mirror.is_some_and(|(lo, hi)| {
            if lo > hi {
                phi > lo || phi < hi
            } else {
                phi > lo && phi < hi
            }
        });
        in_mirror
            || if self.wraps() {
                phi > self.phi_min || phi < self.phi_max
            } else {
                phi >= self.phi_min && phi < self.phi_max
            }
    }

    /// Angular width, measured anti-clockwise from `phi_min`.
    fn span(&self) -> f64 {
        if self.wraps() {
            self.phi_max + TAU - self.phi_min
        } else {
            self.phi_max - self.phi_min
        }
    }

    /// Angle relative to `phi_min`, unwrapped through zero.
    fn offset(&self, phi: f64) -> f64 {
        let offset = phi - self.phi_min;
        if self.wraps() && offset < 0.0 {
            offset + TAU
        } else {
            offset
        }
    }
}

/// Sector averager.
#[derive(Clone, Debug)]
pub struct Sector {
    config: SectorConfig,
    mode: SectorMode,
    options: SweepOptions,
}

impl Sector {
    /// Create a sector averager with the given binning mode.
    #[must_use]
    pub fn new(config: SectorConfig, mode: SectorMode) -> Self {
        Self {
            config,
            mode,
            options: SweepOptions::default(),
        }
    }

    /// I(phi) averager.
    #[must_use]
    pub fn phi(config: SectorConfig) -> Self {
        Self::new(config, SectorMode::Phi)
    }

    /// I(Q) averager over one wedge.
    #[must_use]
    pub fn q(config: SectorConfig) -> Self {
        Self::new(config, SectorMode::Q)
    }

    /// I(Q) averager over the wedge and its mirror.
    #[must_use]
    pub fn symmetric_q(config: SectorConfig) -> Self {
        Self::new(config, SectorMode::SymmetricQ)
    }

    /// Set execution options.
    #[must_use]
    pub fn with_options(mut self, options: SweepOptions) -> Self {
        self.options = options;
        self
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &SectorConfig {
        &self.config
    }

    /// Get the binning mode.
    #[must_use]
    pub fn mode(&self) -> SectorMode {
        self.mode
    }

    /// Largest pixel-centre Q inside the wedge, if any pixel is inside.
    fn wedge_q_max(&self, geometry: &FrameGeometry, wedge: &Wedge) -> Option<f64> {
        let column_max = |col: usize| {
            (0..geometry.rows())
                .map(|row| geometry.pixel(row, col))
                .filter(|pixel| wedge.contains(pixel.phi()))
                .map(|pixel| pixel.q)
                .fold(f64::NEG_INFINITY, f64::max)
        };
        let q_max = if self.options.parallel {
            (0..geometry.cols())
                .into_par_iter()
                .map(column_max)
                .reduce(|| f64::NEG_INFINITY, f64::max)
        } else {
            (0..geometry.cols())
                .map(column_max)
                .fold(f64::NEG_INFINITY, f64::max)
        };
        q_max.is_finite().then_some(q_max)
    }

    /// Perform the sector average.
    pub fn average(&self, frame: &DetectorFrame) -> Result<Reduced1D> {
        let geometry = frame.geometry()?;
        let config = &self.config;
        let nbins = config.nbins;
        if nbins == 0 {
            return Err(Error::ConfigError("sector needs at least one bin".into()));
        }

        let mode = self.mode;
        let wedge = Wedge::new(config, mode == SectorMode::SymmetricQ);
        let q_min = config.r_min;
        let q_max = if mode.bins_q() {
            self.wedge_q_max(&geometry, &wedge).unwrap_or_else(|| {
                log::debug!("sector {mode}: no pixel inside the wedge");
                config.r_max
            })
        } else {
            config.r_max
        };
        log::debug!(
            "sector {mode}: wedge [{}, {}], q [{q_min}, {q_max}], {nbins} bins",
            wedge.phi_min,
            wedge.phi_max
        );

        // (start, ln(q_max / start)) of a logarithmic Q axis.
        let log_axis = match config.base {
            Some(base) if mode.bins_q() => {
                if !(base.is_finite() && base > 0.0 && (base - 1.0).abs() > f64::EPSILON) {
                    return Err(Error::ConfigError(format!(
                        "logarithm base must be positive and not 1, got {base}"
                    )));
                }
                let start = if q_min > 0.0 { q_min } else { LOG_Q_FLOOR };
                log::debug!("sector {mode}: log bins from {start} (base {base})");
                Some((start, (q_max / start).ln()))
            }
            _ => None,
        };

        let bins = nbins as f64;
        let (axis_start, axis_span) = if mode.bins_q() {
            (q_min, q_max - q_min)
        } else {
            (wedge.phi_min, wedge.span())
        };

        let acc = sweep_columns(geometry.cols(), nbins, self.options, |col, acc| {
            for row in 0..geometry.rows() {
                let pixel = geometry.pixel(row, col);
                let phi = pixel.phi();
                if !wedge.contains(phi) {
                    continue;
                }
                if mode.bins_q() && (pixel.q < q_min || pixel.q > q_max) {
                    continue;
                }
                let frac = pixel.annulus_fraction(q_min, q_max);
                if frac == 0.0 {
                    continue;
                }

                let mut index = if let Some((start, ratio)) = log_axis {
                    if pixel.q < start || !(ratio > 0.0) {
                        continue;
                    }
                    (bins * (pixel.q / start).ln() / ratio).floor()
                } else if mode.bins_q() {
                    (bins * (pixel.q - q_min) / axis_span).floor()
                } else {
                    (bins * wedge.offset(phi) / axis_span).floor()
                };
                // A value on the upper edge of the range goes in the last bin.
                if index == bins {
                    index -= 1.0;
                }
                if !(index >= 0.0 && index < bins) {
                    return Err(Error::BinIndexOutOfRange {
                        row,
                        col,
                        index,
                        nbins,
                    });
                }
                acc.add(
                    index as usize,
                    frac,
                    frame.intensity[[row, col]],
                    frame.variance(row, col),
                );
            }
            Ok(())
        })?;

        let x = match log_axis {
            Some((start, ratio)) => log_bin_centres(start, ratio, nbins),
            None => bin_centres(axis_start, axis_span, nbins),
        };
        Ok(acc.finish_with_x(x))
    }
}

impl Averager for Sector {
    fn name(&self) -> &'static str {
        match self.mode {
            SectorMode::Phi => "SectorPhi",
            SectorMode::Q => "SectorQ",
            SectorMode::SymmetricQ => "SectorQ2",
        }
    }

    fn average(&self, frame: &DetectorFrame) -> Result<Reduced1D> {
        Sector::average(self, frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sector_defaults() {
        let config = SectorConfig::default();
        assert_eq!(config.nbins, 20);
        assert_relative_eq!(config.phi_max, TAU);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("phi".parse::<SectorMode>().unwrap(), SectorMode::Phi);
        assert_eq!("Q".parse::<SectorMode>().unwrap(), SectorMode::Q);
        assert_eq!("q2".parse::<SectorMode>().unwrap(), SectorMode::SymmetricQ);
        assert!("r".parse::<SectorMode>().is_err());
    }

    #[test]
    fn test_wedge_normalization() {
        let wedge = Wedge::new(&SectorConfig::new(0.0, 1.0, 1.0, TAU + 0.5), false);
        assert_relative_eq!(wedge.phi_max, 0.5, epsilon = 1e-12);
        assert!(wedge.wraps());
        assert!(wedge.contains(0.2));
        assert!(wedge.contains(3.0));
        assert!(!wedge.contains(0.7));
        assert_relative_eq!(wedge.span(), TAU - 0.5, epsilon = 1e-12);
        assert_relative_eq!(wedge.offset(0.2), TAU - 0.8, epsilon = 1e-12);

        // A negative phi_min widens phi_max instead.
        let wedge = Wedge::new(&SectorConfig::new(0.0, 1.0, -0.5, 0.5), false);
        assert_relative_eq!(wedge.phi_min, -0.5);
        assert_relative_eq!(wedge.phi_max, TAU + 0.5);
    }

    #[test]
    fn test_wedge_mirror() {
        let wedge = Wedge::new(&SectorConfig::new(0.0, 1.0, 0.5, 1.0), true);
        let (lo, hi) = wedge.mirror.unwrap();
        assert_relative_eq!(lo, 0.5 + PI);
        assert_relative_eq!(hi, 1.0 + PI);
        assert!(wedge.contains(0.75));
        assert!(wedge.contains(0.75 + PI));
        assert!(!wedge.contains(2.0));
    }

    #[test]
    fn test_log_bin_centres_are_geometric() {
        let centres = log_bin_centres(1e-3, 10.0_f64.ln(), 4);
        assert_eq!(centres.len(), 4);
        assert_relative_eq!(centres[0], 1e-3 * 10.0_f64.powf(0.125), max_relative = 1e-12);
        for pair in centres.windows(2) {
            assert_relative_eq!(pair[1] / pair[0], 10.0_f64.powf(0.25), max_relative = 1e-12);
        }
    }

    #[test]
    fn test_invalid_log_base() {
        use ndarray::Array2;
        use sasred_core::{Detector, Source, Vector2};

        let frame = DetectorFrame::new(
            Array2::from_elem((6, 6), 1.0),
            Detector::new(Vector2::new(1.0, 1.0), Vector2::new(3.0, 3.0), 1000.0),
            Source::new(6.0),
        );
        for base in [1.0, 0.0, -2.0, f64::NAN] {
            let config = SectorConfig::new(0.0, 1.0, 0.0, TAU).with_base(base);
            let err = Sector::q(config).average(&frame).unwrap_err();
            assert!(matches!(err, Error::ConfigError(_)), "base {base}: {err}");
        }
        // Phi mode never looks at the base.
        let config = SectorConfig::new(0.0, 1.0, 0.0, TAU).with_base(1.0);
        assert!(Sector::phi(config).average(&frame).is_ok());
    }

    #[test]
    fn test_names() {
        let config = SectorConfig::default();
        assert_eq!(Sector::phi(config.clone()).name(), "SectorPhi");
        assert_eq!(Sector::q(config.clone()).name(), "SectorQ");
        assert_eq!(Sector::symmetric_q(config).mode(), SectorMode::SymmetricQ);
    }
}
