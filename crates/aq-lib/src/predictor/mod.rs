//! CO prediction engine

mod output;
mod service;

pub use output::{round_to, OutputFormatter, PREDICTION_DECIMALS};
pub use service::PredictionService;

use crate::error::Result;
use crate::models::{PredictionRequest, PredictionResult, Reading};

/// Trait for prediction implementations
pub trait Predictor: Send + Sync {
    /// Predict CO concentration and flag out-of-distribution input
    fn predict(&self, reading: &Reading) -> Result<PredictionResult>;

    /// Translate a wire-format request and predict
    fn predict_request(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        self.predict(&request.to_reading()?)
    }

    /// Version reported with every result
    fn model_version(&self) -> &str;

    /// False when the predictor can only answer with errors
    fn is_ready(&self) -> bool;
}
