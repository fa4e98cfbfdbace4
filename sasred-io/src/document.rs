//! JSON documents for detector frames and reduction plans.

use crate::{Error, Result};
use ndarray::Array2;
use sasred_algorithms::Reduction;
use sasred_core::{Detector, DetectorFrame, Source};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// On-disk form of a [`DetectorFrame`].
///
/// Arrays are stored row-major as nested lists, `intensity[row][col]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameDocument {
    /// Pixel intensities.
    pub intensity: Vec<Vec<f64>>,
    /// Optional per-pixel errors, same shape as `intensity`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Vec<Vec<f64>>>,
    /// Detector banks.
    pub detectors: Vec<Detector>,
    /// Source description.
    pub source: Source,
}

fn to_array(name: &str, rows: &[Vec<f64>]) -> Result<Array2<f64>> {
    let ncols = rows.first().map_or(0, Vec::len);
    if let Some(bad) = rows.iter().position(|row| row.len() != ncols) {
        return Err(Error::InvalidFormat(format!(
            "{name} row {bad} has {} values, expected {ncols}",
            rows[bad].len()
        )));
    }
    let data: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), ncols), data)
        .map_err(|err| Error::InvalidFormat(format!("{name}: {err}")))
}

fn to_rows(array: &Array2<f64>) -> Vec<Vec<f64>> {
    array.rows().into_iter().map(|row| row.to_vec()).collect()
}

impl FrameDocument {
    /// Converts to a validated frame.
    pub fn into_frame(self) -> Result<DetectorFrame> {
        let frame = DetectorFrame {
            intensity: to_array("intensity", &self.intensity)?,
            error: self
                .error
                .as_deref()
                .map(|rows| to_array("error", rows))
                .transpose()?,
            detectors: self.detectors,
            source: self.source,
        };
        frame.validate()?;
        Ok(frame)
    }
}

impl From<&DetectorFrame> for FrameDocument {
    fn from(frame: &DetectorFrame) -> Self {
        Self {
            intensity: to_rows(&frame.intensity),
            error: frame.error.as_ref().map(to_rows),
            detectors: frame.detectors.clone(),
            source: frame.source,
        }
    }
}

/// A reduction plan: one reduction or a list of them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlanDocument {
    /// A single reduction.
    Single(Reduction),
    /// Several reductions run in order.
    Many(Vec<Reduction>),
}

impl PlanDocument {
    /// Flattens into the list of reductions.
    #[must_use]
    pub fn into_reductions(self) -> Vec<Reduction> {
        match self {
            Self::Single(reduction) => vec![reduction],
            Self::Many(reductions) => reductions,
        }
    }
}

/// Reads a frame document from a JSON file.
pub fn load_frame<P: AsRef<Path>>(path: P) -> Result<DetectorFrame> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let document: FrameDocument = serde_json::from_reader(reader)?;
    let frame = document.into_frame()?;
    log::debug!(
        "loaded {}x{} frame from {}",
        frame.rows(),
        frame.cols(),
        path.display()
    );
    Ok(frame)
}

/// Writes a frame as a JSON document.
pub fn save_frame<P: AsRef<Path>>(path: P, frame: &DetectorFrame) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(writer, &FrameDocument::from(frame))?;
    Ok(())
}

/// Reads the reductions of a plan document.
pub fn load_plan<P: AsRef<Path>>(path: P) -> Result<Vec<Reduction>> {
    let reader = BufReader::new(File::open(path)?);
    let plan: PlanDocument = serde_json::from_reader(reader)?;
    Ok(plan.into_reductions())
}
