//! Outlier and out-of-distribution detection
//!
//! This module provides:
//! - Z-score screening of training rows
//! - An isolation forest that flags inputs unlike the training data

mod isolation_forest;
mod zscore;

pub use isolation_forest::{IsolationForest, IsolationForestConfig, Verdict};
pub use zscore::{ScreenOutcome, ZScoreScreen, DEFAULT_Z_THRESHOLD};
