//! Region cuts: boolean pixel masks for ring, box and sector regions.
//!
//! Unlike the averagers, cuts classify whole pixels by their centre.

use ndarray::Array2;
use sasred_core::{flip_phi, DetectorFrame, Result};
use std::f64::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pixels whose centre Q lies in `[r_min, r_max]`.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RingCut {
    /// Minimum radius [1/length].
    pub r_min: f64,
    /// Maximum radius [1/length].
    pub r_max: f64,
}

impl RingCut {
    /// Creates a ring cut.
    #[must_use]
    pub fn new(r_min: f64, r_max: f64) -> Self {
        Self { r_min, r_max }
    }

    /// Mask shaped like the intensity array.
    pub fn mask(&self, frame: &DetectorFrame) -> Result<Array2<bool>> {
        let geometry = frame.geometry()?;
        Ok(Array2::from_shape_fn(frame.intensity.dim(), |(row, col)| {
            let q = geometry.q(geometry.x_offset(col), geometry.y_offset(row));
            self.r_min <= q && q <= self.r_max
        }))
    }
}

/// Pixels whose centre lies in `[x_min, x_max) × [y_min, y_max)` in Q.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoxCut {
    /// Minimum Qx.
    pub x_min: f64,
    /// Maximum Qx.
    pub x_max: f64,
    /// Minimum Qy.
    pub y_min: f64,
    /// Maximum Qy.
    pub y_max: f64,
}

impl BoxCut {
    /// Creates a box cut.
    #[must_use]
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Mask shaped like the intensity array.
    pub fn mask(&self, frame: &DetectorFrame) -> Result<Array2<bool>> {
        let geometry = frame.geometry()?;
        Ok(Array2::from_shape_fn(frame.intensity.dim(), |(row, col)| {
            let qx = geometry.axis_q(geometry.x_offset(col));
            let qy = geometry.axis_q(geometry.y_offset(row));
            (self.x_min <= qx && qx < self.x_max) && (self.y_min <= qy && qy < self.y_max)
        }))
    }
}

/// Pixels inside a wedge or its mirror rotated by π.
///
/// Angles here are `atan2(dy, dx)` in `(-π, π]`, measured from the positive
/// x axis; `phi_max - phi_min` should not exceed π.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SectorCut {
    /// Wedge start angle [rad].
    pub phi_min: f64,
    /// Wedge end angle [rad].
    pub phi_max: f64,
}

impl Default for SectorCut {
    fn default() -> Self {
        Self {
            phi_min: 0.0,
            phi_max: PI,
        }
    }
}

impl SectorCut {
    /// Creates a sector cut.
    #[must_use]
    pub fn new(phi_min: f64, phi_max: f64) -> Self {
        Self { phi_min, phi_max }
    }

    /// Mask shaped like the intensity array.
    pub fn mask(&self, frame: &DetectorFrame) -> Result<Array2<bool>> {
        let geometry = frame.geometry()?;

        let major = (
            flip_phi(self.phi_min + PI) - PI,
            flip_phi(self.phi_max + PI) - PI,
        );
        let minor = (flip_phi(self.phi_min) - PI, flip_phi(self.phi_max) - PI);

        Ok(Array2::from_shape_fn(frame.intensity.dim(), |(row, col)| {
            let phi = geometry.y_offset(row).atan2(geometry.x_offset(col));
            let in_major = if major.0 > major.1 {
                major.0 <= phi || major.1 > phi
            } else {
                major.0 <= phi && major.1 > phi
            };
            let in_minor = if minor.0 > minor.1 {
                minor.0 <= phi || minor.1 >= phi
            } else {
                minor.0 <= phi && minor.1 >= phi
            };
            in_major || in_minor
        }))
    }
}
