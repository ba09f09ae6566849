//! Local, in-process prediction

use anyhow::Result;
use aq_lib::{PredictionRequest, PredictionResult, PredictionService, Predictor};
use colored::Colorize;
use std::path::Path;

use crate::output::{color_status, print_heading, print_json, print_table, Field, OutputFormat};

/// Load the artifacts in `models_dir` and score one request
pub fn predict_local(
    models_dir: &Path,
    request: &PredictionRequest,
    format: OutputFormat,
) -> Result<()> {
    let service = PredictionService::load(models_dir);
    let result = service.predict_request(request)?;
    print_prediction(request, &result, format)
}

/// Render a prediction in the requested format
pub fn print_prediction(
    request: &PredictionRequest,
    result: &PredictionResult,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(result)?,
        OutputFormat::Table => {
            print_heading("CO Prediction");
            let distribution = if result.is_out_of_distribution {
                "out-of-distribution"
            } else {
                "in-distribution"
            };
            print_table(vec![
                Field::new("Timestamp", &request.date_time),
                Field::new(
                    "CO(GT) mg/m³",
                    format!("{:.4}", result.prediction_co_gt).cyan(),
                ),
                Field::new("Input", color_status(distribution)),
                Field::new("Model version", &result.model_version),
            ]);
            if result.is_out_of_distribution {
                println!(
                    "\n{}",
                    "Input lies outside the training distribution; treat the estimate with caution"
                        .yellow()
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_artifacts_are_reported() {
        let dir = TempDir::new().unwrap();
        let err = predict_local(dir.path(), &PredictionRequest::example(), OutputFormat::Json)
            .unwrap_err()
            .to_string();
        assert!(err.contains("Prediction assets not loaded"));
    }
}
