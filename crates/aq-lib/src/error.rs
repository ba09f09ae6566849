//! Error types for the prediction pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised by loading, training and prediction.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Startup artifacts are missing or invalid; the predictor refuses work
    #[error("Prediction assets not loaded: {0}. Please run the training pipeline.")]
    AssetsNotLoaded(String),

    /// Malformed timestamp or field in a reading
    #[error("Failed to parse input data: {0}")]
    DataParse(String),

    /// Reindexing against the trained feature schema failed
    #[error("Feature alignment failed: {0}")]
    FeatureAlignment(String),

    /// Training source file does not exist
    #[error("Data file not found at '{}'", .0.display())]
    SourceDataMissing(PathBuf),

    /// Source file contained no usable rows
    #[error("Dataset is empty: {0}")]
    EmptyDataset(String),

    /// Table rows do not match the declared columns
    #[error("Malformed table: {0}")]
    Shape(String),

    /// Persisted artifact failed validation
    #[error("Invalid artifact {name}: {reason}")]
    InvalidArtifact {
        /// File name of the artifact
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// CSV reader error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Short machine-readable kind, used for metrics labels and logs
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::AssetsNotLoaded(_) => "assets_not_loaded",
            PipelineError::DataParse(_) => "data_parse",
            PipelineError::FeatureAlignment(_) => "feature_alignment",
            PipelineError::SourceDataMissing(_) => "source_data_missing",
            PipelineError::EmptyDataset(_) => "empty_dataset",
            PipelineError::Shape(_) => "shape",
            PipelineError::InvalidArtifact { .. } => "invalid_artifact",
            PipelineError::Csv(_) => "csv",
            PipelineError::Serialization(_) => "serialization",
            PipelineError::Io(_) => "io",
        }
    }

    /// True for errors caused by the caller's input rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::DataParse(_) | PipelineError::FeatureAlignment(_)
        )
    }
}
