//! Pixel-to-Q geometry and pixel-fraction primitives.
//!
//! Every averaging engine maps detector pixels to reciprocal space with
//! [`q_from_offset`] and weighs partial pixels with either [`edge_fraction`]
//! (axis-aligned Q boundaries) or [`pixel_corner_fraction`] (constant-Q
//! circles).
#![allow(clippy::cast_precision_loss, clippy::many_single_char_names)]

use crate::error::{Error, Result};
use crate::frame::{Detector, Source, Vector2};
use std::f64::consts::{PI, TAU};

/// Momentum transfer for a planar offset `(dx, dy)` from the beam centre.
///
/// `Q = 4π/λ · sin(½·atan(r/d))` with `r = sqrt(dx² + dy²)`.
#[inline]
#[must_use]
pub fn q_from_offset(dx: f64, dy: f64, distance: f64, wavelength: f64) -> f64 {
    let plane_dist = dx.hypot(dy);
    let theta = 0.5 * (plane_dist / distance).atan();
    (4.0 * PI / wavelength) * theta.sin()
}

/// Fraction of the segment `[x_min, x_max]` lying below `x`.
///
/// ```text
///        A            B
///    +-----------+---------+
///    x_min       x         x_max
/// ```
///
/// Returns `A / (A + B)`, clamped to `[0, 1]`.
#[inline]
#[must_use]
pub fn edge_fraction(x: f64, x_min: f64, x_max: f64) -> f64 {
    if x <= x_min {
        0.0
    } else if x >= x_max {
        1.0
    } else {
        (x - x_min) / (x_max - x_min)
    }
}

/// Fractional position along a pixel side where the constant-`q` contour
/// crosses it, measured from the lower-Q end.
///
/// Returns `None` when `q` is not strictly above the lower end and at most
/// the upper end.
#[inline]
#[must_use]
pub fn edge_intercept(q: f64, q_from: f64, q_to: f64) -> Option<f64> {
    if q_to > q_from {
        if q > q_from && q <= q_to {
            return Some((q - q_from) / (q_to - q_from));
        }
    } else if q > q_to && q <= q_from {
        return Some((q - q_to) / (q_from - q_to));
    }
    None
}

/// Fraction of a pixel's area with `Q < threshold`.
///
/// The corners are labelled `q_[x][y]`:
///
/// ```text
///          q01            q11
///     y=1   +--------------+
///           |              |
///           |              |
///     y=0   +--------------+
///          q00            q10
///          x=0            x=1
/// ```
///
/// The iso-Q contour is approximated by a straight line between the edge
/// intercepts.
#[must_use]
pub fn pixel_corner_fraction(threshold: f64, q00: f64, q01: f64, q10: f64, q11: f64) -> f64 {
    // y sides at x = min and x = max
    let x_0 = edge_intercept(threshold, q00, q01);
    let x_1 = edge_intercept(threshold, q10, q11);
    // x sides at y = min and y = max
    let y_0 = edge_intercept(threshold, q00, q10);
    let y_1 = edge_intercept(threshold, q01, q11);

    match (x_0, x_1, y_0, y_1) {
        (Some(a), Some(b), _, _) => (a + b) / 2.0,
        (_, _, Some(a), Some(b)) => (a + b) / 2.0,
        (Some(a), None, Some(b), None) => {
            if q00 < q10 {
                a * b / 2.0
            } else {
                1.0 - a * b / 2.0
            }
        }
        (Some(a), None, None, Some(b)) => {
            if q00 < q10 {
                a * b / 2.0
            } else {
                1.0 - a * b / 2.0
            }
        }
        (None, Some(a), Some(b), None) => {
            if q00 > q10 {
                a * b / 2.0
            } else {
                1.0 - a * b / 2.0
            }
        }
        (None, Some(a), None, Some(b)) => {
            if q00 < q10 {
                1.0 - (1.0 - a) * (1.0 - b) / 2.0
            } else {
                (1.0 - a) * (1.0 - b) / 2.0
            }
        }
        // No crossing: the pixel is entirely on one side of the contour.
        _ => {
            if (q00 + q01 + q10 + q11) / 4.0 < threshold {
                1.0
            } else {
                0.0
            }
        }
    }
}

/// Folds an angle into `[0, 2π]` by one turn.
#[inline]
#[must_use]
pub fn flip_phi(phi: f64) -> f64 {
    if phi < 0.0 {
        phi + TAU
    } else if phi > TAU {
        phi - TAU
    } else {
        phi
    }
}

/// Q values of one pixel: centre plus the four corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelQ {
    /// X offset of the pixel centre from the beam centre.
    pub dx: f64,
    /// Y offset of the pixel centre from the beam centre.
    pub dy: f64,
    /// Q at the pixel centre.
    pub q: f64,
    /// Corner Qs, `[q00, q01, q10, q11]`.
    pub corners: [f64; 4],
}

impl PixelQ {
    /// Fraction of the pixel with `Q < threshold`.
    #[inline]
    #[must_use]
    pub fn fraction_below(&self, threshold: f64) -> f64 {
        let [q00, q01, q10, q11] = self.corners;
        pixel_corner_fraction(threshold, q00, q01, q10, q11)
    }

    /// Fraction of the pixel inside the annulus `r_min <= Q < r_max`.
    #[inline]
    #[must_use]
    pub fn annulus_fraction(&self, r_min: f64, r_max: f64) -> f64 {
        self.fraction_below(r_max) - self.fraction_below(r_min)
    }

    /// Azimuth of the pixel centre in `[0, 2π]`.
    #[inline]
    #[must_use]
    pub fn phi(&self) -> f64 {
        self.dy.atan2(self.dx) + PI
    }
}

/// Pixel-to-Q mapping resolved from a detector and source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGeometry {
    pixel_size: Vector2,
    beam_center: Vector2,
    // Beam centre in pixel units.
    center_col: f64,
    center_row: f64,
    distance: f64,
    wavelength: f64,
    rows: usize,
    cols: usize,
}

impl FrameGeometry {
    /// Resolves the geometry, rejecting zero pixel sizes and non-physical
    /// distance or wavelength.
    pub fn new(detector: &Detector, source: &Source, rows: usize, cols: usize) -> Result<Self> {
        let pixel_size = detector.pixel_size;
        if pixel_size.x == 0.0
            || pixel_size.y == 0.0
            || !pixel_size.x.is_finite()
            || !pixel_size.y.is_finite()
        {
            return Err(Error::InvalidPixelSize {
                x: pixel_size.x,
                y: pixel_size.y,
            });
        }
        if !(detector.distance.is_finite() && detector.distance > 0.0) {
            return Err(Error::InvalidGeometry(format!(
                "sample-to-detector distance must be positive, got {}",
                detector.distance
            )));
        }
        if !(source.wavelength.is_finite() && source.wavelength > 0.0) {
            return Err(Error::InvalidGeometry(format!(
                "wavelength must be positive, got {}",
                source.wavelength
            )));
        }
        Ok(Self {
            pixel_size,
            beam_center: detector.beam_center,
            center_col: detector.beam_center.x / pixel_size.x,
            center_row: detector.beam_center.y / pixel_size.y,
            distance: detector.distance,
            wavelength: source.wavelength,
            rows,
            cols,
        })
    }

    /// Number of pixel rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of pixel columns.
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Q for a planar offset from the beam centre.
    #[inline]
    #[must_use]
    pub fn q(&self, dx: f64, dy: f64) -> f64 {
        q_from_offset(dx, dy, self.distance, self.wavelength)
    }

    /// Signed Q along one detector axis; negative offsets give negative Q.
    #[inline]
    #[must_use]
    pub fn axis_q(&self, offset: f64) -> f64 {
        let q = self.q(offset, 0.0);
        if offset < 0.0 {
            -q
        } else {
            q
        }
    }

    /// X offset of a column centre.
    #[inline]
    #[must_use]
    pub fn x_offset(&self, col: usize) -> f64 {
        self.pixel_size.x * (col as f64 + 0.5 - self.center_col)
    }

    /// Y offset of a row centre.
    #[inline]
    #[must_use]
    pub fn y_offset(&self, row: usize) -> f64 {
        self.pixel_size.y * (row as f64 + 0.5 - self.center_row)
    }

    /// X offsets of a column's lower and upper edges.
    #[inline]
    #[must_use]
    pub fn x_edges(&self, col: usize) -> (f64, f64) {
        let col = col as f64;
        (
            self.pixel_size.x * (col - self.center_col),
            self.pixel_size.x * (col + 1.0 - self.center_col),
        )
    }

    /// Y offsets of a row's lower and upper edges.
    #[inline]
    #[must_use]
    pub fn y_edges(&self, row: usize) -> (f64, f64) {
        let row = row as f64;
        (
            self.pixel_size.y * (row - self.center_row),
            self.pixel_size.y * (row + 1.0 - self.center_row),
        )
    }

    /// Centre and corner Q values of one pixel.
    #[must_use]
    pub fn pixel(&self, row: usize, col: usize) -> PixelQ {
        let dx = self.x_offset(col);
        let dy = self.y_offset(row);
        let (min_x, max_x) = self.x_edges(col);
        let (min_y, max_y) = self.y_edges(row);
        PixelQ {
            dx,
            dy,
            q: self.q(dx, dy),
            corners: [
                self.q(min_x, min_y),
                self.q(min_x, max_y),
                self.q(max_x, min_y),
                self.q(max_x, max_y),
            ],
        }
    }

    /// Q at the detector corner farthest from the beam centre.
    #[must_use]
    pub fn max_q(&self) -> f64 {
        let width = self.cols as f64 * self.pixel_size.x;
        let height = self.rows as f64 * self.pixel_size.y;
        let dx_max = (width - self.beam_center.x).max(self.beam_center.x);
        let dy_max = (height - self.beam_center.y).max(self.beam_center.y);
        self.q(dx_max, dy_max)
    }
}
