//! Offline model training

mod config;
mod trainer;

pub use config::{OutlierScope, TrainingConfig, DEFAULT_SEED, DEFAULT_TEST_FRACTION};
pub use trainer::{FittedModel, Trainer, TrainingReport};
