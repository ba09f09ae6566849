//! Air-quality CO prediction library
//!
//! This crate provides the core functionality for:
//! - Loading and cleaning the raw multi-sensor dataset
//! - Feature engineering against a frozen feature schema
//! - Training the scaler, OOD detector and CO regressor
//! - Serving predictions from persisted artifacts
//! - Health checks and observability

pub mod anomaly;
pub mod artifacts;
pub mod data;
pub mod error;
pub mod features;
pub mod health;
pub mod ml;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod training;

pub use error::{PipelineError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{PredictorMetrics, StructuredLogger};
pub use predictor::{PredictionService, Predictor};
