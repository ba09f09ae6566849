//! Gradient-boosted regression trees with squared-error loss
//!
//! Starts from the target mean and adds shallow trees fit to the current
//! residuals, each on a random row subsample, shrunk by the learning rate.

use super::tree::{RegressionTree, TreeParams};
use crate::error::{PipelineError, Result};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Boosting hyper-parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostingConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Fraction of rows drawn (without replacement) for each round
    pub subsample: f64,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            learning_rate: 0.1,
            max_depth: 4,
            subsample: 0.8,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

/// Fitted boosting ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    n_features: usize,
    init: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoostingRegressor {
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        config: &BoostingConfig,
    ) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(PipelineError::Shape(format!(
                "{} feature rows for {} targets",
                x.nrows(),
                y.len()
            )));
        }
        let init = y.mean().ok_or_else(|| {
            PipelineError::EmptyDataset("cannot fit regressor on zero rows".to_string())
        })?;

        let n = x.nrows();
        let n_features = x.ncols();
        let mut current = Array1::from_elem(n, init);
        let sample_size = ((config.subsample.clamp(0.0, 1.0) * n as f64) as usize).clamp(1, n);
        let params = TreeParams {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
        };
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut trees = Vec::with_capacity(config.n_estimators);

        for round in 0..config.n_estimators {
            let residuals = &y - &current;
            let rows = if sample_size < n {
                rand::seq::index::sample(&mut rng, n, sample_size).into_vec()
            } else {
                (0..n).collect()
            };
            let tree = RegressionTree::fit(x, residuals.view(), &rows, &params);
            for (pred, row) in current.iter_mut().zip(x.rows()) {
                *pred += config.learning_rate * tree.predict_row(row);
            }
            trees.push(tree);

            if (round + 1) % 50 == 0 {
                let mse = (&y - &current).mapv(|d| d * d).mean().unwrap_or(0.0);
                debug!(round = round + 1, train_mse = mse, "Boosting progress");
            }
        }

        Ok(Self {
            n_features,
            init,
            learning_rate: config.learning_rate,
            trees,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    fn check_width(&self, width: usize) -> Result<()> {
        if width != self.n_features {
            return Err(PipelineError::FeatureAlignment(format!(
                "regressor expects {} features, got {}",
                self.n_features, width
            )));
        }
        Ok(())
    }

    fn raw_predict(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.init + self.learning_rate * self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
    }

    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> Result<f64> {
        self.check_width(row.len())?;
        Ok(self.raw_predict(row))
    }

    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        self.check_width(x.ncols())?;
        Ok(x.rows().into_iter().map(|row| self.raw_predict(row)).collect())
    }

    /// Structural check for a deserialized model
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| PipelineError::InvalidArtifact {
            name: "regressor".to_string(),
            reason,
        };
        if !self.init.is_finite() || !self.learning_rate.is_finite() {
            return Err(invalid("non-finite parameters".to_string()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            if !tree.is_well_formed() {
                return Err(invalid(format!("tree {} is malformed", i)));
            }
            if tree.max_feature_index().is_some_and(|f| f >= self.n_features) {
                return Err(invalid(format!("tree {} references unknown feature", i)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::metrics::RegressionMetrics;
    use ndarray::{array, Array2};

    fn linear_data(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| match j {
            0 => (i % 17) as f64 / 17.0,
            _ => (i % 5) as f64 / 5.0,
        });
        let y = x
            .rows()
            .into_iter()
            .map(|r| 3.0 * r[0] + 2.0 * r[1] + 1.0)
            .collect();
        (x, y)
    }

    fn rounds(n_estimators: usize) -> BoostingConfig {
        BoostingConfig {
            n_estimators,
            ..Default::default()
        }
    }

    #[test]
    fn test_boosting_fits_smooth_target() {
        let (x, y) = linear_data(300);
        let model = GradientBoostingRegressor::fit(x.view(), y.view(), &rounds(60)).unwrap();
        let preds = model.predict(x.view()).unwrap();
        let metrics = RegressionMetrics::evaluate(y.view(), preds.view());
        assert!(metrics.r2 > 0.95, "r2 was {}", metrics.r2);
        assert_eq!(model.n_estimators(), 60);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_boosting_is_deterministic_for_seed() {
        let (x, y) = linear_data(100);
        let a = GradientBoostingRegressor::fit(x.view(), y.view(), &rounds(10)).unwrap();
        let b = GradientBoostingRegressor::fit(x.view(), y.view(), &rounds(10)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_rounds_predicts_mean() {
        let (x, y) = linear_data(50);
        let model = GradientBoostingRegressor::fit(x.view(), y.view(), &rounds(0)).unwrap();
        let mean = y.mean().unwrap();
        assert!((model.predict_row(x.row(0)).unwrap() - mean).abs() < 1e-12);
    }

    #[test]
    fn test_predict_rejects_wrong_width() {
        let (x, y) = linear_data(20);
        let model = GradientBoostingRegressor::fit(x.view(), y.view(), &rounds(2)).unwrap();
        assert!(matches!(
            model.predict_row(array![1.0].view()),
            Err(PipelineError::FeatureAlignment(_))
        ));
        assert!(model.predict(Array2::zeros((3, 1)).view()).is_err());
    }

    #[test]
    fn test_fit_rejects_bad_shapes() {
        let (x, y) = linear_data(20);
        assert!(matches!(
            GradientBoostingRegressor::fit(x.view(), y.slice(ndarray::s![..10]), &rounds(2)),
            Err(PipelineError::Shape(_))
        ));
        let empty = Array2::<f64>::zeros((0, 2));
        assert!(matches!(
            GradientBoostingRegressor::fit(empty.view(), Array1::zeros(0).view(), &rounds(2)),
            Err(PipelineError::EmptyDataset(_))
        ));
    }
}
