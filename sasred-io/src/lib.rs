//! sasred-io: Reading frames and plans, writing reduced profiles.
//!
//! Frames and reduction plans are JSON documents; profiles are written as
//! whitespace-separated text columns.
//!

mod document;
mod error;
mod format;
mod writer;

pub use document::{load_frame, load_plan, save_frame, FrameDocument, PlanDocument};
pub use error::{Error, Result};
pub use format::format_g;
pub use writer::ProfileWriter;
