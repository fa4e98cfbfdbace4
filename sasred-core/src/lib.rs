//! sasred-core: Detector frames, Q-space geometry and result types.
//!
//! This crate provides the foundational pieces shared by every averaging
//! engine: the in-memory 2D detector frame, the pixel-to-Q geometry and
//! pixel-fraction primitives, and the reduced 1D / box result containers.
//!

pub mod error;
pub mod frame;
pub mod geometry;
pub mod result;

pub use error::{Error, Result};
pub use frame::{Detector, DetectorFrame, Source, Vector2};
pub use geometry::{
    edge_fraction, edge_intercept, flip_phi, pixel_corner_fraction, q_from_offset, FrameGeometry,
    PixelQ,
};
pub use result::{BoxResult, ProfilePoint, Reduced1D};
