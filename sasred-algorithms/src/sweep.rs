//! Shared per-bin accumulation and the column-chunked pixel sweep.
//!
//! Every engine walks the detector column by column (rows inner) and adds
//! weighted intensities into bins. Columns are split into fixed-size chunks,
//! each reduced into its own [`BinAccumulator`], and the partial results are
//! merged in column order. Chunk boundaries do not depend on the thread
//! count, so a sweep gives bit-identical results in parallel and serial mode.
#![allow(clippy::cast_precision_loss)]

use rayon::prelude::*;
use sasred_core::{Error, Reduced1D, Result};
use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Columns handled by one work item.
const COLUMN_CHUNK: usize = 16;

/// Execution options shared by all engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SweepOptions {
    /// Whether to reduce column chunks on the rayon thread pool.
    pub parallel: bool,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl SweepOptions {
    /// Serial sweep.
    #[must_use]
    pub fn serial() -> Self {
        Self { parallel: false }
    }

    /// Set whether to use parallel processing.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Running sums for a fixed number of bins.
#[derive(Clone, Debug)]
pub(crate) struct BinAccumulator {
    sum: Vec<f64>,
    variance: Vec<f64>,
    weight: Vec<f64>,
    x: Vec<f64>,
    touched: Vec<bool>,
}

impl BinAccumulator {
    pub(crate) fn new(nbins: usize) -> Self {
        Self {
            sum: vec![0.0; nbins],
            variance: vec![0.0; nbins],
            weight: vec![0.0; nbins],
            x: vec![0.0; nbins],
            touched: vec![false; nbins],
        }
    }

    pub(crate) fn nbins(&self) -> usize {
        self.weight.len()
    }

    /// Adds `frac` of a pixel with the given intensity and variance.
    #[inline]
    pub(crate) fn add(&mut self, bin: usize, frac: f64, intensity: f64, variance: f64) {
        self.sum[bin] += frac * intensity;
        self.variance[bin] += frac * frac * variance;
        self.weight[bin] += frac;
    }

    /// Records the bin position; the last write wins.
    #[inline]
    pub(crate) fn set_x(&mut self, bin: usize, x: f64) {
        self.x[bin] = x;
        self.touched[bin] = true;
    }

    /// Folds in the accumulator of a later column range.
    pub(crate) fn merge(&mut self, later: &Self) {
        for bin in 0..self.nbins() {
            self.sum[bin] += later.sum[bin];
            self.variance[bin] += later.variance[bin];
            self.weight[bin] += later.weight[bin];
            if later.touched[bin] {
                self.x[bin] = later.x[bin];
                self.touched[bin] = true;
            }
        }
    }

    /// Raw `(sum, variance, weight)` of one bin.
    pub(crate) fn totals(&self, bin: usize) -> (f64, f64, f64) {
        (self.sum[bin], self.variance[bin], self.weight[bin])
    }

    /// Averages every populated bin, keeping the recorded x positions.
    pub(crate) fn finish(self) -> Reduced1D {
        let x = self.x.clone();
        self.finish_with_x(x)
    }

    /// Averages every populated bin and uses `x` as the bin positions.
    pub(crate) fn finish_with_x(self, x: Vec<f64>) -> Reduced1D {
        let nbins = self.nbins();
        let mut y = vec![0.0; nbins];
        let mut dy = vec![0.0; nbins];
        for bin in 0..nbins {
            let weight = self.weight[bin];
            if weight > 0.0 {
                y[bin] = self.sum[bin] / weight;
                dy[bin] = self.variance[bin].sqrt() / weight;
            }
        }
        Reduced1D {
            x,
            y,
            dy,
            weight: self.weight,
        }
    }
}

/// Runs `visit` for every column and merges the per-chunk accumulators.
pub(crate) fn sweep_columns<F>(
    cols: usize,
    nbins: usize,
    options: SweepOptions,
    visit: F,
) -> Result<BinAccumulator>
where
    F: Fn(usize, &mut BinAccumulator) -> Result<()> + Sync,
{
    let chunks: Vec<Range<usize>> = (0..cols)
        .step_by(COLUMN_CHUNK)
        .map(|start| start..(start + COLUMN_CHUNK).min(cols))
        .collect();

    let run = |range: &Range<usize>| -> Result<BinAccumulator> {
        let mut acc = BinAccumulator::new(nbins);
        for col in range.clone() {
            visit(col, &mut acc)?;
        }
        Ok(acc)
    };

    let partials: Vec<Result<BinAccumulator>> = if options.parallel {
        chunks.par_iter().map(run).collect()
    } else {
        chunks.iter().map(run).collect()
    };

    let mut total = BinAccumulator::new(nbins);
    for partial in partials {
        total.merge(&partial?);
    }
    Ok(total)
}

/// Number of bins of width `width` needed to cover `span`.
///
/// Returns 0 for an empty or inverted span.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn bin_count(span: f64, width: f64) -> Result<usize> {
    if !(width.is_finite() && width > 0.0) {
        return Err(Error::ConfigError(format!(
            "bin width must be positive, got {width}"
        )));
    }
    let nbins = (span / width).ceil();
    if nbins.is_nan() || nbins.is_infinite() {
        return Err(Error::ConfigError(format!(
            "cannot bin a range of {span} with width {width}"
        )));
    }
    Ok(if nbins > 0.0 { nbins as usize } else { 0 })
}

/// Bin for `value` in bins of `width` starting at `start`, using the
/// `ceil(..) - 1` convention (a value on a bin's upper edge belongs to it).
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn upper_edge_bin(value: f64, start: f64, width: f64, nbins: usize) -> Option<usize> {
    let index = ((value - start) / width).ceil() - 1.0;
    if index >= 0.0 && index < nbins as f64 {
        Some(index as usize)
    } else {
        None
    }
}

/// Bin centres evenly spread over `[start, start + span]`.
pub(crate) fn bin_centres(start: f64, span: f64, nbins: usize) -> Vec<f64> {
    let step = span / nbins as f64;
    (0..nbins).map(|i| start + step * (i as f64 + 0.5)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_count() {
        assert_eq!(bin_count(1.0, 0.25).unwrap(), 4);
        assert_eq!(bin_count(1.1, 0.25).unwrap(), 5);
        assert_eq!(bin_count(-1.0, 0.25).unwrap(), 0);
        assert!(bin_count(1.0, 0.0).is_err());
        assert!(bin_count(f64::NAN, 0.1).is_err());
    }

    #[test]
    fn test_upper_edge_bin() {
        assert_eq!(upper_edge_bin(0.25, 0.0, 0.25, 4), Some(0));
        assert_eq!(upper_edge_bin(0.26, 0.0, 0.25, 4), Some(1));
        assert_eq!(upper_edge_bin(0.0, 0.0, 0.25, 4), None);
        assert_eq!(upper_edge_bin(1.01, 0.0, 0.25, 4), None);
    }

    #[test]
    fn test_merge_keeps_last_x() {
        let mut first = BinAccumulator::new(2);
        first.add(0, 1.0, 10.0, 10.0);
        first.set_x(0, 0.1);
        first.set_x(1, 0.2);

        let mut second = BinAccumulator::new(2);
        second.add(0, 0.5, 20.0, 20.0);
        second.set_x(0, 0.15);

        first.merge(&second);
        let profile = first.finish();
        assert!((profile.x[0] - 0.15).abs() < f64::EPSILON);
        assert!((profile.x[1] - 0.2).abs() < f64::EPSILON);
        assert!((profile.weight[0] - 1.5).abs() < f64::EPSILON);
        assert!((profile.y[0] - 20.0 / 1.5).abs() < 1e-12);
        assert!((profile.dy[0] - (10.0_f64 + 0.25 * 20.0).sqrt() / 1.5).abs() < 1e-12);
        // Untouched weight leaves y at zero.
        assert_eq!(profile.y[1], 0.0);
    }

    #[test]
    fn test_sweep_serial_matches_parallel() {
        let visit = |col: usize, acc: &mut BinAccumulator| -> Result<()> {
            let bin = col % acc.nbins();
            acc.add(bin, 0.3, col as f64 * 1.1, col as f64);
            acc.set_x(bin, col as f64);
            Ok(())
        };
        let serial = sweep_columns(100, 7, SweepOptions::serial(), visit)
            .unwrap()
            .finish();
        let parallel = sweep_columns(100, 7, SweepOptions::default(), visit)
            .unwrap()
            .finish();
        assert_eq!(serial, parallel);
        // Highest column of each residue class wrote last.
        assert_eq!(serial.x[0], 98.0);
    }

    #[test]
    fn test_sweep_propagates_errors() {
        let result = sweep_columns(40, 1, SweepOptions::default(), |col, _acc| {
            if col == 33 {
                Err(Error::ConfigError("boom".into()))
            } else {
                Ok(())
            }
        });
        assert!(result.is_err());
    }
}
