//! Prediction output formatting
//!
//! Turns the raw regressor output and the OOD verdict into the result
//! returned to callers.

use crate::anomaly::Verdict;
use crate::error::{PipelineError, Result};
use crate::models::PredictionResult;

/// Decimal places kept in `prediction_co_gt`
pub const PREDICTION_DECIMALS: u32 = 4;

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Formats raw model outputs into a [`PredictionResult`]
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    decimals: u32,
    model_version: String,
}

impl OutputFormatter {
    pub fn new(model_version: impl Into<String>) -> Self {
        Self {
            decimals: PREDICTION_DECIMALS,
            model_version: model_version.into(),
        }
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    pub fn format(&self, raw_prediction: f64, verdict: Verdict) -> Result<PredictionResult> {
        if !raw_prediction.is_finite() {
            return Err(PipelineError::FeatureAlignment(format!(
                "regressor produced a non-finite value ({})",
                raw_prediction
            )));
        }
        Ok(PredictionResult {
            prediction_co_gt: round_to(raw_prediction, self.decimals),
            is_out_of_distribution: verdict.is_outlier(),
            model_version: self.model_version.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_four_places() {
        assert_eq!(round_to(2.123_456, 4), 2.1235);
        assert_eq!(round_to(-1.000_04, 4), -1.0);
        assert_eq!(round_to(3.0, 4), 3.0);
    }

    #[test]
    fn test_format_sets_flag_and_version() {
        let formatter = OutputFormatter::new("1.0.0");
        let result = formatter.format(1.234_567, Verdict::Outlier).unwrap();
        assert_eq!(result.prediction_co_gt, 1.2346);
        assert!(result.is_out_of_distribution);
        assert_eq!(result.model_version, "1.0.0");

        let result = formatter.format(0.5, Verdict::Inlier).unwrap();
        assert!(!result.is_out_of_distribution);
    }

    #[test]
    fn test_non_finite_prediction_is_rejected() {
        let formatter = OutputFormatter::new("1.0.0");
        assert!(formatter.format(f64::NAN, Verdict::Inlier).is_err());
    }
}
