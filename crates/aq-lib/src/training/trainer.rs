//! Batch training pipeline
//!
//! Load, engineer features, screen outliers, split, scale, fit the OOD
//! detector and the regressor, evaluate on the hold-out rows and persist.

use super::config::{OutlierScope, TrainingConfig};
use crate::anomaly::{IsolationForest, ZScoreScreen};
use crate::artifacts::{ArtifactBundle, Manifest};
use crate::data::{DataLoader, LoadReport, ReadingTable};
use crate::error::{PipelineError, Result};
use crate::features::{FeatureEngineer, FeatureSchema};
use crate::ml::{train_test_split, GradientBoostingRegressor, RegressionMetrics, StandardScaler};
use crate::models::TARGET_COLUMN;
use crate::observability::StructuredLogger;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

/// Summary of one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Present when the run read a file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load: Option<LoadReport>,
    pub rows_available: usize,
    pub outliers_removed: usize,
    pub outlier_scope: OutlierScope,
    pub train_rows: usize,
    pub test_rows: usize,
    pub feature_names: Vec<String>,
    pub metrics: RegressionMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models_dir: Option<PathBuf>,
    pub duration_secs: f64,
}

/// A fitted bundle with its report, not yet persisted
#[derive(Debug, Clone)]
pub struct FittedModel {
    pub bundle: ArtifactBundle,
    pub report: TrainingReport,
}

/// Rows of `x` and `y` at `indices`, in that order
fn select(x: &Array2<f64>, y: &Array1<f64>, indices: &[usize]) -> (Array2<f64>, Array1<f64>) {
    (x.select(Axis(0), indices), y.select(Axis(0), indices))
}

/// Runs the training pipeline described by a [`TrainingConfig`]
pub struct Trainer {
    config: TrainingConfig,
    logger: StructuredLogger,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            logger: StructuredLogger::new("aq-trainer"),
        }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Load the configured file, fit, save the artifacts and report
    pub fn run(&self) -> Result<(TrainingReport, Manifest)> {
        let loaded = DataLoader::new(self.config.loader.clone()).load(&self.config.data_path)?;
        let mut fitted = self.fit(&loaded.table)?;
        fitted.report.load = Some(loaded.report);

        let manifest = fitted
            .bundle
            .save(&self.config.models_dir, Some(fitted.report.metrics))?;
        fitted.report.models_dir = Some(self.config.models_dir.clone());

        let report = &fitted.report;
        self.logger.log_training_summary(
            report.train_rows,
            report.outliers_removed,
            report.metrics.r2,
            report.metrics.mae,
            report.metrics.rmse,
        );
        Ok((fitted.report, manifest))
    }

    /// Fit every component on an in-memory reading table
    pub fn fit(&self, readings: &ReadingTable) -> Result<FittedModel> {
        let started = Instant::now();
        let config = &self.config;

        let features = FeatureEngineer::new().transform(readings)?;
        let y = features.column(TARGET_COLUMN).ok_or_else(|| {
            PipelineError::Shape(format!("target column '{}' is missing", TARGET_COLUMN))
        })?;
        let schema = FeatureSchema::from_table(&features, &[TARGET_COLUMN]);
        if schema.is_empty() {
            return Err(PipelineError::Shape("no feature columns besides the target".to_string()));
        }
        let x = schema.align(&features)?.values;
        let y = Array1::from(y);
        let rows_available = x.nrows();
        info!(
            rows = rows_available,
            n_features = schema.len(),
            outlier_scope = %config.outlier_scope,
            "Starting training"
        );

        let screen = ZScoreScreen::new(config.z_threshold);
        let (x_train, y_train, x_test, y_test, outliers_removed) = match config.outlier_scope {
            OutlierScope::FullDataset => {
                let outcome = screen.screen(x.view());
                let (x, y) = select(&x, &y, &outcome.kept_indices());
                let split = train_test_split(x.nrows(), config.test_fraction, config.split_seed)?;
                let (x_train, y_train) = select(&x, &y, &split.train);
                let (x_test, y_test) = select(&x, &y, &split.test);
                (x_train, y_train, x_test, y_test, outcome.removed)
            }
            OutlierScope::TrainingPartition => {
                let split = train_test_split(x.nrows(), config.test_fraction, config.split_seed)?;
                let (x_train, y_train) = select(&x, &y, &split.train);
                let (x_test, y_test) = select(&x, &y, &split.test);
                let outcome = screen.screen(x_train.view());
                let (x_train, y_train) = select(&x_train, &y_train, &outcome.kept_indices());
                (x_train, y_train, x_test, y_test, outcome.removed)
            }
        };
        debug!(
            outliers_removed,
            train_rows = x_train.nrows(),
            test_rows = x_test.nrows(),
            "Outlier screen and split done"
        );
        if x_train.nrows() == 0 {
            return Err(PipelineError::EmptyDataset(
                "no training rows left after outlier screening".to_string(),
            ));
        }

        let names: Vec<String> = schema.names().into_iter().map(String::from).collect();
        let scaler = StandardScaler::fit(names.clone(), x_train.view())?;
        let x_train = scaler.transform(x_train.view())?;
        let x_test = scaler.transform(x_test.view())?;

        let ood_detector = IsolationForest::fit(x_train.view(), &config.isolation_forest)?;
        debug!(threshold = ood_detector.threshold(), "OOD detector fitted");
        let regressor =
            GradientBoostingRegressor::fit(x_train.view(), y_train.view(), &config.boosting)?;

        let predictions = regressor.predict(x_test.view())?;
        let metrics = RegressionMetrics::evaluate(y_test.view(), predictions.view());
        info!(
            r2 = metrics.r2,
            mae = metrics.mae,
            rmse = metrics.rmse,
            test_rows = metrics.n_samples,
            "Hold-out evaluation"
        );

        Ok(FittedModel {
            bundle: ArtifactBundle {
                scaler,
                ood_detector,
                regressor,
            },
            report: TrainingReport {
                load: None,
                rows_available,
                outliers_removed,
                outlier_scope: config.outlier_scope,
                train_rows: y_train.len(),
                test_rows: y_test.len(),
                feature_names: names,
                metrics,
                models_dir: None,
                duration_secs: started.elapsed().as_secs_f64(),
            },
        })
    }
}
