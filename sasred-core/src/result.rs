//! Reduced output containers.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One populated point of a reduced profile.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProfilePoint {
    /// Bin position (Q or phi).
    pub x: f64,
    /// Weighted mean intensity.
    pub y: f64,
    /// Propagated standard error.
    pub dy: f64,
}

/// Reduced 1D profile, I(Q) or I(phi).
///
/// All vectors have one entry per bin. Bins with zero accumulated weight
/// keep `y = 0` and `dy = 0` and carry no data.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reduced1D {
    /// Bin position (Q or phi).
    pub x: Vec<f64>,
    /// Weighted mean intensity per bin.
    pub y: Vec<f64>,
    /// Standard error per bin.
    pub dy: Vec<f64>,
    /// Accumulated pixel weight per bin.
    pub weight: Vec<f64>,
}

impl Reduced1D {
    /// Number of bins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Returns true if there are no bins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Number of bins with data.
    #[must_use]
    pub fn populated_bins(&self) -> usize {
        self.weight.iter().filter(|&&w| w > 0.0).count()
    }

    /// Sum of all bin weights.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.weight.iter().sum()
    }

    /// Iterates over bins with data.
    pub fn points(&self) -> impl Iterator<Item = ProfilePoint> + '_ {
        self.weight
            .iter()
            .enumerate()
            .filter(|(_, &w)| w > 0.0)
            .map(|(i, _)| ProfilePoint {
                x: self.x[i],
                y: self.y[i],
                dy: self.dy[i],
            })
    }

    /// Copy holding only the bins with data.
    #[must_use]
    pub fn trimmed(&self) -> Self {
        let keep: Vec<usize> = (0..self.len()).filter(|&i| self.weight[i] > 0.0).collect();
        Self {
            x: keep.iter().map(|&i| self.x[i]).collect(),
            y: keep.iter().map(|&i| self.y[i]).collect(),
            dy: keep.iter().map(|&i| self.dy[i]).collect(),
            weight: keep.iter().map(|&i| self.weight[i]).collect(),
        }
    }
}

/// Scalar result of a box sum or box average.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoxResult {
    /// Summed or averaged counts.
    pub value: f64,
    /// Error on `value`.
    pub error: f64,
    /// Accumulated pixel weight inside the box.
    pub weight: f64,
}

impl BoxResult {
    /// `(value, error)` pair.
    #[must_use]
    pub fn as_pair(&self) -> (f64, f64) {
        (self.value, self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_skip_empty_bins() {
        let profile = Reduced1D {
            x: vec![0.1, 0.0, 0.3],
            y: vec![5.0, 0.0, 7.0],
            dy: vec![0.5, 0.0, 0.7],
            weight: vec![2.0, 0.0, 1.5],
        };
        assert_eq!(profile.len(), 3);
        assert_eq!(profile.populated_bins(), 2);
        let xs: Vec<f64> = profile.points().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.1, 0.3]);

        let trimmed = profile.trimmed();
        assert_eq!(trimmed.len(), 2);
        assert_eq!(trimmed.y, vec![5.0, 7.0]);
        assert!((profile.total_weight() - 3.5).abs() < f64::EPSILON);
    }
}
