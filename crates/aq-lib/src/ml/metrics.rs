//! Regression evaluation metrics

use ndarray::{s, ArrayView1};
use serde::{Deserialize, Serialize};

/// Held-out evaluation summary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub r2: f64,
    pub mae: f64,
    pub rmse: f64,
    pub n_samples: usize,
}

impl RegressionMetrics {
    pub fn evaluate<'a>(y_true: ArrayView1<'a, f64>, y_pred: ArrayView1<'a, f64>) -> Self {
        Self {
            r2: r2_score(y_true, y_pred),
            mae: mean_absolute_error(y_true, y_pred),
            rmse: root_mean_squared_error(y_true, y_pred),
            n_samples: y_true.len().min(y_pred.len()),
        }
    }
}

/// Paired prefix of both series
fn paired<'a>(
    y_true: ArrayView1<'a, f64>,
    y_pred: ArrayView1<'a, f64>,
) -> (ArrayView1<'a, f64>, ArrayView1<'a, f64>) {
    let n = y_true.len().min(y_pred.len());
    (y_true.slice_move(s![..n]), y_pred.slice_move(s![..n]))
}

/// Coefficient of determination
///
/// A constant target scores 1 when predicted exactly and 0 otherwise.
pub fn r2_score<'a>(y_true: ArrayView1<'a, f64>, y_pred: ArrayView1<'a, f64>) -> f64 {
    let (t, p) = paired(y_true, y_pred);
    let Some(mean) = t.mean() else {
        return 0.0;
    };
    let ss_res = (&t - &p).mapv(|d| d * d).sum();
    let ss_tot = t.mapv(|v| (v - mean).powi(2)).sum();
    if ss_tot < f64::EPSILON {
        return if ss_res < f64::EPSILON { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

pub fn mean_absolute_error<'a>(y_true: ArrayView1<'a, f64>, y_pred: ArrayView1<'a, f64>) -> f64 {
    let (t, p) = paired(y_true, y_pred);
    (&t - &p).mapv(f64::abs).mean().unwrap_or(0.0)
}

pub fn root_mean_squared_error<'a>(y_true: ArrayView1<'a, f64>, y_pred: ArrayView1<'a, f64>) -> f64 {
    let (t, p) = paired(y_true, y_pred);
    (&t - &p).mapv(|d| d * d).mean().unwrap_or(0.0).sqrt()
}
