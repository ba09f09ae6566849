//! Training run configuration

use crate::anomaly::{IsolationForestConfig, DEFAULT_Z_THRESHOLD};
use crate::data::LoaderConfig;
use crate::ml::BoostingConfig;
use crate::models::TARGET_COLUMN;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default hold-out share
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

/// Default seed for the split and both ensembles
pub const DEFAULT_SEED: u64 = 42;

/// Which rows the z-score screen computes its statistics over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutlierScope {
    /// Screen only the training partition, after the split
    #[default]
    TrainingPartition,
    /// Screen every row before the split; test rows influence the cutoff
    FullDataset,
}

impl OutlierScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutlierScope::TrainingPartition => "training-partition",
            OutlierScope::FullDataset => "full-dataset",
        }
    }
}

impl fmt::Display for OutlierScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutlierScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "training-partition" => Ok(OutlierScope::TrainingPartition),
            "full-dataset" => Ok(OutlierScope::FullDataset),
            other => Err(format!(
                "unknown outlier scope '{}' (expected training-partition or full-dataset)",
                other
            )),
        }
    }
}

/// Everything a training run needs
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Raw dataset file
    pub data_path: PathBuf,
    /// Directory receiving the artifacts
    pub models_dir: PathBuf,
    pub loader: LoaderConfig,
    pub outlier_scope: OutlierScope,
    pub z_threshold: f64,
    pub test_fraction: f64,
    pub split_seed: u64,
    pub isolation_forest: IsolationForestConfig,
    pub boosting: BoostingConfig,
}

impl TrainingConfig {
    /// Defaults for every hyper-parameter; rows without a target are dropped
    pub fn new(data_path: impl Into<PathBuf>, models_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            models_dir: models_dir.into(),
            loader: LoaderConfig {
                required_columns: vec![TARGET_COLUMN.to_string()],
                ..Default::default()
            },
            outlier_scope: OutlierScope::default(),
            z_threshold: DEFAULT_Z_THRESHOLD,
            test_fraction: DEFAULT_TEST_FRACTION,
            split_seed: DEFAULT_SEED,
            isolation_forest: IsolationForestConfig::default(),
            boosting: BoostingConfig::default(),
        }
    }

    /// Use `seed` for the split and both ensembles
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.split_seed = seed;
        self.isolation_forest.seed = seed;
        self.boosting.seed = seed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrainingConfig::new("data/AirQualityUCI.csv", "models");
        assert_eq!(config.outlier_scope, OutlierScope::TrainingPartition);
        assert_eq!(config.test_fraction, 0.2);
        assert_eq!(config.split_seed, 42);
        assert_eq!(config.isolation_forest.n_estimators, 300);
        assert_eq!(config.isolation_forest.contamination, 0.05);
        assert_eq!(config.boosting.n_estimators, 200);
        assert_eq!(config.boosting.learning_rate, 0.1);
        assert_eq!(config.boosting.max_depth, 4);
        assert_eq!(config.boosting.subsample, 0.8);
        assert_eq!(config.loader.required_columns, vec!["CO(GT)".to_string()]);
    }

    #[test]
    fn test_with_seed_reaches_every_component() {
        let config = TrainingConfig::new("d.csv", "m").with_seed(7);
        assert_eq!(config.split_seed, 7);
        assert_eq!(config.isolation_forest.seed, 7);
        assert_eq!(config.boosting.seed, 7);
    }

    #[test]
    fn test_outlier_scope_parsing() {
        for scope in [OutlierScope::TrainingPartition, OutlierScope::FullDataset] {
            assert_eq!(scope.as_str().parse::<OutlierScope>(), Ok(scope));
        }
        assert!("everything".parse::<OutlierScope>().is_err());
        assert_eq!(
            serde_json::to_string(&OutlierScope::FullDataset).unwrap(),
            "\"full-dataset\""
        );
    }
}
