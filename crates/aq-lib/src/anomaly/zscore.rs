//! Z-score outlier screening
//!
//! Rejects training rows where any feature lies more than a fixed number of
//! population standard deviations from that feature's mean.

use ndarray::{ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Default rejection cutoff (3 sigma)
pub const DEFAULT_Z_THRESHOLD: f64 = 3.0;

/// Mean and population standard deviation of one feature
#[derive(Debug, Clone, Copy, PartialEq)]
struct ColumnStats {
    mean: f64,
    std_dev: f64,
}

impl ColumnStats {
    /// `None` for a constant feature
    fn z_score(&self, value: f64) -> Option<f64> {
        if self.std_dev < f64::EPSILON {
            return None;
        }
        Some((value - self.mean) / self.std_dev)
    }
}

/// Per-column statistics of `x`; empty when `x` has no rows
fn column_stats(x: ArrayView2<'_, f64>) -> Vec<ColumnStats> {
    let Some(mean) = x.mean_axis(Axis(0)) else {
        return Vec::new();
    };
    let std_dev = x.std_axis(Axis(0), 0.0);
    mean.iter()
        .zip(&std_dev)
        .map(|(&mean, &std_dev)| ColumnStats { mean, std_dev })
        .collect()
}

/// Outcome of screening a row set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenOutcome {
    /// One flag per input row, `true` when the row is kept
    pub keep: Vec<bool>,
    pub removed: usize,
}

impl ScreenOutcome {
    pub fn kept(&self) -> usize {
        self.keep.len() - self.removed
    }

    /// Positions of the kept rows, in input order
    pub fn kept_indices(&self) -> Vec<usize> {
        self.keep
            .iter()
            .enumerate()
            .filter_map(|(i, k)| k.then_some(i))
            .collect()
    }
}

/// Row-wise |z| screen over every column
#[derive(Debug, Clone, Copy)]
pub struct ZScoreScreen {
    /// Number of standard deviations beyond which a row is rejected
    pub threshold: f64,
}

impl ZScoreScreen {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Screen the rows of `x` against statistics computed from the same rows
    pub fn screen(&self, x: ArrayView2<'_, f64>) -> ScreenOutcome {
        let stats = column_stats(x);
        let keep: Vec<bool> = x
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .zip(&stats)
                    .all(|(v, s)| s.z_score(*v).map_or(true, |z| z.abs() <= self.threshold))
            })
            .collect();
        let removed = keep.iter().filter(|k| !**k).count();
        ScreenOutcome { keep, removed }
    }
}

impl Default for ZScoreScreen {
    fn default() -> Self {
        Self::new(DEFAULT_Z_THRESHOLD)
    }
}
