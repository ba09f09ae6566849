//! Per-feature standardisation (zero mean, unit variance)

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Fitted standard scaler
///
/// Uses the population standard deviation. Constant features get a scale
/// of 1 so they map to 0 instead of dividing by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    feature_names: Vec<String>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit on `x`, whose columns are named by `feature_names`
    pub fn fit(feature_names: Vec<String>, x: ArrayView2<'_, f64>) -> Result<Self> {
        if x.ncols() != feature_names.len() {
            return Err(PipelineError::Shape(format!(
                "{} feature names for {} columns",
                feature_names.len(),
                x.ncols()
            )));
        }
        let mean = x.mean_axis(Axis(0)).ok_or_else(|| {
            PipelineError::EmptyDataset("cannot fit scaler on zero rows".to_string())
        })?;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|std| if std < f64::EPSILON { 1.0 } else { std });

        Ok(Self {
            feature_names,
            mean: mean.to_vec(),
            scale: scale.to_vec(),
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    fn check_width(&self, width: usize) -> Result<()> {
        if width != self.n_features() {
            return Err(PipelineError::FeatureAlignment(format!(
                "scaler expects {} features, got {}",
                self.n_features(),
                width
            )));
        }
        Ok(())
    }

    pub fn transform_row(&self, row: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        self.check_width(row.len())?;
        let mean = ArrayView1::from(self.mean.as_slice());
        let scale = ArrayView1::from(self.scale.as_slice());
        Ok((&row - &mean) / &scale)
    }

    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.check_width(x.ncols())?;
        let mean = ArrayView1::from(self.mean.as_slice());
        let scale = ArrayView1::from(self.scale.as_slice());
        Ok((&x - &mean) / &scale)
    }

    /// Internal consistency check for a deserialized scaler
    pub fn validate(&self) -> Result<()> {
        let width = self.feature_names.len();
        if self.mean.len() != width || self.scale.len() != width {
            return Err(PipelineError::InvalidArtifact {
                name: "scaler".to_string(),
                reason: format!(
                    "{} names, {} means, {} scales",
                    width,
                    self.mean.len(),
                    self.scale.len()
                ),
            });
        }
        if self.scale.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(PipelineError::InvalidArtifact {
                name: "scaler".to_string(),
                reason: "non-positive scale".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{}", i)).collect()
    }

    #[test]
    fn test_fit_statistics() {
        let x = array![[1.0, 10.0], [3.0, 10.0], [5.0, 10.0]];
        let scaler = StandardScaler::fit(names(2), x.view()).unwrap();
        assert_eq!(scaler.mean(), &[3.0, 10.0]);
        // population std of 1,3,5
        assert!((scaler.scale()[0] - (8.0f64 / 3.0).sqrt()).abs() < 1e-12);
        // constant column
        assert_eq!(scaler.scale()[1], 1.0);
    }

    #[test]
    fn test_transformed_columns_are_standardised() {
        let x = Array2::from_shape_fn((50, 2), |(i, j)| i.pow(j as u32 + 1) as f64);
        let scaler = StandardScaler::fit(names(2), x.view()).unwrap();
        let scaled = scaler.transform(x.view()).unwrap();
        let mean = scaled.mean_axis(Axis(0)).unwrap();
        let std = scaled.std_axis(Axis(0), 0.0);
        for col in 0..2 {
            assert!(mean[col].abs() < 1e-9);
            assert!((std[col] - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_row_and_matrix_transforms_agree() {
        let x = array![[1.0, 4.0], [2.0, 8.0], [6.0, 0.0]];
        let scaler = StandardScaler::fit(names(2), x.view()).unwrap();
        let whole = scaler.transform(x.view()).unwrap();
        for (i, row) in x.rows().into_iter().enumerate() {
            assert_eq!(scaler.transform_row(row).unwrap(), whole.row(i));
        }
    }

    #[test]
    fn test_width_mismatch() {
        let scaler = StandardScaler::fit(names(2), array![[1.0, 2.0]].view()).unwrap();
        assert!(matches!(
            scaler.transform_row(array![1.0].view()),
            Err(PipelineError::FeatureAlignment(_))
        ));
        assert!(StandardScaler::fit(names(2), array![[1.0]].view()).is_err());
        assert!(matches!(
            StandardScaler::fit(names(2), Array2::zeros((0, 2)).view()),
            Err(PipelineError::EmptyDataset(_))
        ));
    }

    #[test]
    fn test_validate_rejects_inconsistent_scaler() {
        let mut scaler = StandardScaler::fit(names(2), array![[1.0, 2.0]].view()).unwrap();
        assert!(scaler.validate().is_ok());
        scaler.scale.pop();
        assert!(scaler.validate().is_err());
    }
}
