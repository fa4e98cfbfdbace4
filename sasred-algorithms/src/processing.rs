//! Configuration-driven dispatch over the reduction engines.

use crate::{
    Averager, BoxAverage, BoxConfig, BoxSum, CircularAverage, CircularConfig, Ring, RingConfig,
    Sector, SectorConfig, SectorMode, Slab, SlabAxis, SlabConfig, SweepOptions,
};
use sasred_core::{BoxResult, DetectorFrame, Error, Reduced1D, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One reduction request with its region parameters.
///
/// With the `serde` feature this reads from JSON as
/// `{"kind": "circular", "r_min": 0.0, "r_max": 0.1, "bin_width": 0.001}`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Reduction {
    /// I(Qx) over a horizontal band.
    SlabX(SlabConfig),
    /// I(Qy) over a vertical band.
    SlabY(SlabConfig),
    /// Isotropic I(Q).
    Circular(CircularConfig),
    /// I(phi) over an annulus.
    Ring(RingConfig),
    /// I(phi) over a wedge.
    SectorPhi(SectorConfig),
    /// I(Q) over a wedge.
    SectorQ(SectorConfig),
    /// I(Q) over a wedge and its mirror.
    SectorQSymmetric(SectorConfig),
    /// Summed counts in a box.
    BoxSum(BoxConfig),
    /// Averaged counts in a box.
    BoxAverage(BoxConfig),
}

/// Output of [`Reduction::run`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ReductionOutput {
    /// A binned profile.
    Profile(Reduced1D),
    /// A scalar box result.
    Box(BoxResult),
}

impl Reduction {
    /// Engine name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SlabX(_) => "SlabX",
            Self::SlabY(_) => "SlabY",
            Self::Circular(_) => "CircularAverage",
            Self::Ring(_) => "Ring",
            Self::SectorPhi(_) => "SectorPhi",
            Self::SectorQ(_) => "SectorQ",
            Self::SectorQSymmetric(_) => "SectorQ2",
            Self::BoxSum(_) => "Boxsum",
            Self::BoxAverage(_) => "Boxavg",
        }
    }

    /// True when the profile axis is phi rather than Q.
    #[must_use]
    pub fn is_angular(&self) -> bool {
        matches!(self, Self::Ring(_) | Self::SectorPhi(_))
    }

    /// Builds the profile engine, or `None` for box reductions.
    #[must_use]
    pub fn averager(&self, options: SweepOptions) -> Option<Box<dyn Averager>> {
        let engine: Box<dyn Averager> = match self {
            Self::SlabX(config) => {
                Box::new(Slab::new(config.clone(), SlabAxis::X).with_options(options))
            }
            Self::SlabY(config) => {
                Box::new(Slab::new(config.clone(), SlabAxis::Y).with_options(options))
            }
            Self::Circular(config) => {
                Box::new(CircularAverage::new(config.clone()).with_options(options))
            }
            Self::Ring(config) => Box::new(Ring::new(config.clone()).with_options(options)),
            Self::SectorPhi(config) => {
                Box::new(Sector::new(config.clone(), SectorMode::Phi).with_options(options))
            }
            Self::SectorQ(config) => {
                Box::new(Sector::new(config.clone(), SectorMode::Q).with_options(options))
            }
            Self::SectorQSymmetric(config) => {
                Box::new(Sector::new(config.clone(), SectorMode::SymmetricQ).with_options(options))
            }
            Self::BoxSum(_) | Self::BoxAverage(_) => return None,
        };
        Some(engine)
    }

    /// Runs the reduction on a frame.
    pub fn run(&self, frame: &DetectorFrame, options: SweepOptions) -> Result<ReductionOutput> {
        log::debug!("running {} on {}x{} frame", self.name(), frame.rows(), frame.cols());
        match self {
            Self::BoxSum(config) => BoxSum::new(config.clone())
                .with_options(options)
                .sum(frame)
                .map(ReductionOutput::Box),
            Self::BoxAverage(config) => BoxAverage::new(config.clone())
                .with_options(options)
                .average(frame)
                .map(ReductionOutput::Box),
            _ => {
                let averager = self.averager(options).ok_or_else(|| {
                    Error::ConfigError(format!("{} has no profile engine", self.name()))
                })?;
                averager.average(frame).map(ReductionOutput::Profile)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use sasred_core::{Detector, Source, Vector2};

    fn frame() -> DetectorFrame {
        DetectorFrame::new(
            Array2::from_elem((10, 10), 100.0),
            Detector::new(Vector2::new(1.0, 1.0), Vector2::new(5.0, 5.0), 1000.0),
            Source::new(6.0),
        )
    }

    #[test]
    fn test_names_match_engines() {
        let options = SweepOptions::default();
        let reductions = [
            Reduction::SlabX(SlabConfig::default()),
            Reduction::SlabY(SlabConfig::default()),
            Reduction::Circular(CircularConfig::default()),
            Reduction::Ring(RingConfig::default()),
            Reduction::SectorPhi(SectorConfig::default()),
            Reduction::SectorQ(SectorConfig::default()),
            Reduction::SectorQSymmetric(SectorConfig::default()),
        ];
        for reduction in &reductions {
            let engine = reduction.averager(options).unwrap();
            assert_eq!(engine.name(), reduction.name());
        }
        assert!(Reduction::BoxSum(BoxConfig::default()).averager(options).is_none());
    }

    #[test]
    fn test_angular_reductions() {
        assert!(Reduction::Ring(RingConfig::default()).is_angular());
        assert!(Reduction::SectorPhi(SectorConfig::default()).is_angular());
        assert!(!Reduction::SectorQ(SectorConfig::default()).is_angular());
        assert!(!Reduction::Circular(CircularConfig::default()).is_angular());
    }

    #[test]
    fn test_run_matches_direct_call() {
        let config = CircularConfig::new(0.0, 1.0).with_bin_width(0.01);
        let direct = CircularAverage::new(config.clone()).average(&frame()).unwrap();
        let output = Reduction::Circular(config)
            .run(&frame(), SweepOptions::default())
            .unwrap();
        assert_eq!(output, ReductionOutput::Profile(direct));
    }

    #[test]
    fn test_run_box() {
        let output = Reduction::BoxAverage(BoxConfig::new(-1.0, 1.0, -1.0, 1.0))
            .run(&frame(), SweepOptions::serial())
            .unwrap();
        match output {
            ReductionOutput::Box(result) => {
                assert!((result.value - 100.0).abs() < 1e-9);
                assert!((result.weight - 100.0).abs() < 1e-9);
            }
            ReductionOutput::Profile(_) => panic!("expected a box result"),
        }
    }

    #[test]
    fn test_run_propagates_errors() {
        let frame = frame().with_detectors(Vec::new());
        let err = Reduction::Ring(RingConfig::new(0.0, 1.0))
            .run(&frame, SweepOptions::default())
            .unwrap_err();
        assert_eq!(err, Error::InvalidDetectorCount(0));
    }
}
