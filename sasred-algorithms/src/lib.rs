//! sasred-algorithms: Q-space reduction of 2D scattering frames.
//!
//! This crate provides the averaging engines:
//! - **Slab** - I(Qx) or I(Qy) over a rectangular band, optionally folded
//! - **Circular** - isotropic I(Q) over an annulus
//! - **Ring** - I(phi) over an annulus
//! - **Sector** - I(phi), I(Q) or mirrored I(Q) over a wedge
//! - **Box** - scalar sum or average over a rectangle
//!
//! plus pixel masks ([`RingCut`], [`BoxCut`], [`SectorCut`]) and the
//! [`Reduction`] dispatcher used by configuration-driven callers.
//!
#![warn(missing_docs)]

mod boxsum;
mod circular;
mod cut;
mod processing;
mod ring;
mod sector;
mod slab;
mod sweep;

pub use boxsum::{BoxAverage, BoxConfig, BoxSum};
pub use circular::{CircularAverage, CircularConfig};
pub use cut::{BoxCut, RingCut, SectorCut};
pub use processing::{Reduction, ReductionOutput};
pub use ring::{Ring, RingConfig};
pub use sector::{Sector, SectorConfig, SectorMode};
pub use slab::{Slab, SlabAxis, SlabConfig};
pub use sweep::SweepOptions;

use sasred_core::{DetectorFrame, Reduced1D, Result};

/// Common interface of the engines producing a 1D profile.
pub trait Averager: Send + Sync {
    /// Name used in logs and output headers.
    fn name(&self) -> &'static str;

    /// Reduce a frame to a profile.
    fn average(&self, frame: &DetectorFrame) -> Result<Reduced1D>;
}
