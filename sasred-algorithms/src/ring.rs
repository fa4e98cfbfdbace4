//! Ring averaging: I(phi) over a fixed Q annulus.
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use crate::sweep::{bin_centres, sweep_columns, SweepOptions};
use crate::Averager;
use sasred_core::{DetectorFrame, Error, Reduced1D, Result};
use std::f64::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Ring region: annulus plus angular binning.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RingConfig {
    /// Minimum radius [1/length].
    pub r_min: f64,
    /// Maximum radius [1/length].
    pub r_max: f64,
    /// Ring centre in x. Not used: the frame's beam centre is the ring centre.
    pub center_x: f64,
    /// Ring centre in y. Not used: the frame's beam centre is the ring centre.
    pub center_y: f64,
    /// Number of angular bins over the full circle.
    pub nbins_phi: usize,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            r_min: 0.0,
            r_max: 0.0,
            center_x: 0.0,
            center_y: 0.0,
            nbins_phi: 20,
        }
    }
}

impl RingConfig {
    /// Creates a ring over `[r_min, r_max]`.
    #[must_use]
    pub fn new(r_min: f64, r_max: f64) -> Self {
        Self {
            r_min,
            r_max,
            ..Self::default()
        }
    }

    /// Sets the (unused) ring centre.
    #[must_use]
    pub fn with_center(mut self, x: f64, y: f64) -> Self {
        self.center_x = x;
        self.center_y = y;
        self
    }

    /// Sets the number of angular bins.
    #[must_use]
    pub fn with_nbins_phi(mut self, nbins: usize) -> Self {
        self.nbins_phi = nbins;
        self
    }
}

/// Angular distribution of counts inside an annulus.
#[derive(Clone, Debug, Default)]
pub struct Ring {
    config: RingConfig,
    options: SweepOptions,
}

impl Ring {
    /// Create with custom configuration.
    #[must_use]
    pub fn new(config: RingConfig) -> Self {
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
    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    /// Returns I(phi) for the annulus. `phi = atan2(dy, dx) + π`, so bin 0
    /// starts on the negative x axis.
    pub fn average(&self, frame: &DetectorFrame) -> Result<Reduced1D> {
        let geometry = frame.geometry()?;
        let RingConfig {
            r_min,
            r_max,
            nbins_phi,
            ..
        } = self.config;
        if nbins_phi == 0 {
            return Err(Error::ConfigError("ring needs at least one phi bin".into()));
        }
        log::debug!("ring [{r_min}, {r_max}]: {nbins_phi} phi bins");

        let nbins = nbins_phi as f64;
        let acc = sweep_columns(geometry.cols(), nbins_phi, self.options, |col, acc| {
            for row in 0..geometry.rows() {
                let pixel = geometry.pixel(row, col);
                let frac = pixel.annulus_fraction(r_min, r_max);
                if frac == 0.0 {
                    continue;
                }
                let index = (nbins * pixel.phi() / TAU).ceil() - 1.0;
                if !(index >= 0.0 && index < nbins) {
                    return Err(Error::BinIndexOutOfRange {
                        row,
                        col,
                        index,
                        nbins: nbins_phi,
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

        Ok(acc.finish_with_x(bin_centres(0.0, TAU, nbins_phi)))
    }
}

impl Averager for Ring {
    fn name(&self) -> &'static str {
        "Ring"
    }

    fn average(&self, frame: &DetectorFrame) -> Result<Reduced1D> {
        Ring::average(self, frame)
    }
}
