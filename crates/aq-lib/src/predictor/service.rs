//! Prediction service built from a trained artifact bundle

use super::output::OutputFormatter;
use super::Predictor;
use crate::anomaly::IsolationForest;
use crate::artifacts::{ArtifactBundle, Manifest};
use crate::data::Table;
use crate::error::{PipelineError, Result};
use crate::features::{FeatureEngineer, FeatureSchema};
use crate::ml::{GradientBoostingRegressor, StandardScaler};
use crate::models::{PredictionRequest, PredictionResult, Reading, MODEL_VERSION};
use std::path::Path;
use tracing::{debug, info, warn};

struct LoadedModel {
    schema: FeatureSchema,
    engineer: FeatureEngineer,
    scaler: StandardScaler,
    ood_detector: IsolationForest,
    regressor: GradientBoostingRegressor,
    manifest: Option<Manifest>,
}

enum ServiceState {
    Ready(Box<LoadedModel>),
    /// Startup could not produce a usable model; holds the reason
    Degraded(String),
}

/// Immutable prediction context shared by all request handlers
///
/// Either fully loaded or permanently degraded. A degraded service answers
/// every prediction with [`PipelineError::AssetsNotLoaded`].
pub struct PredictionService {
    state: ServiceState,
    formatter: OutputFormatter,
}

impl PredictionService {
    /// Load artifacts from `models_dir`, degrading instead of failing
    pub fn load(models_dir: impl AsRef<Path>) -> Self {
        let models_dir = models_dir.as_ref();
        let loaded = ArtifactBundle::load(models_dir)
            .and_then(|(bundle, manifest)| Self::build(bundle, manifest));
        match loaded {
            Ok(service) => {
                info!(
                    models_dir = %models_dir.display(),
                    n_features = service.schema().map(FeatureSchema::len).unwrap_or(0),
                    "Prediction service ready"
                );
                service
            }
            Err(e) => {
                warn!(
                    models_dir = %models_dir.display(),
                    error = %e,
                    "Prediction service degraded"
                );
                let reason = match e {
                    PipelineError::AssetsNotLoaded(reason) => reason,
                    other => other.to_string(),
                };
                Self::degraded(reason)
            }
        }
    }

    /// Build directly from fitted components
    pub fn from_bundle(bundle: ArtifactBundle) -> Result<Self> {
        Self::build(bundle, None)
    }

    /// A service that refuses every prediction
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            state: ServiceState::Degraded(reason.into()),
            formatter: OutputFormatter::new(MODEL_VERSION),
        }
    }

    fn build(bundle: ArtifactBundle, manifest: Option<Manifest>) -> Result<Self> {
        let schema = bundle.validate()?;
        Ok(Self {
            state: ServiceState::Ready(Box::new(LoadedModel {
                schema,
                engineer: FeatureEngineer::new(),
                scaler: bundle.scaler,
                ood_detector: bundle.ood_detector,
                regressor: bundle.regressor,
                manifest,
            })),
            formatter: OutputFormatter::new(MODEL_VERSION),
        })
    }

    /// Why the service is degraded, if it is
    pub fn degraded_reason(&self) -> Option<&str> {
        match &self.state {
            ServiceState::Ready(_) => None,
            ServiceState::Degraded(reason) => Some(reason),
        }
    }

    pub fn schema(&self) -> Option<&FeatureSchema> {
        match &self.state {
            ServiceState::Ready(model) => Some(&model.schema),
            ServiceState::Degraded(_) => None,
        }
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        match &self.state {
            ServiceState::Ready(model) => model.manifest.as_ref(),
            ServiceState::Degraded(_) => None,
        }
    }

    fn ensure_ready(&self) -> Result<&LoadedModel> {
        match &self.state {
            ServiceState::Ready(model) => Ok(model),
            ServiceState::Degraded(reason) => Err(PipelineError::AssetsNotLoaded(reason.clone())),
        }
    }
}

impl Predictor for PredictionService {
    fn predict(&self, reading: &Reading) -> Result<PredictionResult> {
        let model = self.ensure_ready()?;
        reading.validate()?;

        let table = Table::from_readings(std::slice::from_ref(reading))?;
        let features = model.engineer.transform(&table)?;
        let aligned = model.schema.align(&features)?;
        if !aligned.filled.is_empty() {
            debug!(filled = ?aligned.filled, "Absent features filled with defaults");
        }
        let row = aligned.values.rows().into_iter().next().ok_or_else(|| {
            PipelineError::FeatureAlignment("no feature row produced".to_string())
        })?;

        let scaled = model.scaler.transform_row(row)?;
        let verdict = model.ood_detector.predict_row(scaled.view())?;
        let raw = model.regressor.predict_row(scaled.view())?;
        self.formatter.format(raw, verdict)
    }

    /// Missing assets are reported before any problem with the request
    fn predict_request(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        self.ensure_ready()?;
        self.predict(&request.to_reading()?)
    }

    fn model_version(&self) -> &str {
        self.formatter.model_version()
    }

    fn is_ready(&self) -> bool {
        matches!(self.state, ServiceState::Ready(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::tests::tiny_bundle;
    use crate::models::parse_timestamp;
    use tempfile::TempDir;

    fn reading() -> Reading {
        PredictionRequest::example().to_reading().unwrap()
    }

    #[test]
    fn test_degraded_service_refuses_predictions() {
        let service = PredictionService::degraded("scaler.json not found");
        assert!(!service.is_ready());
        assert_eq!(service.degraded_reason(), Some("scaler.json not found"));
        let err = service.predict(&reading()).unwrap_err();
        assert!(matches!(err, PipelineError::AssetsNotLoaded(_)));
        assert!(err.to_string().contains("Please run the training pipeline"));
        assert_eq!(service.model_version(), "1.0.0");
    }

    #[test]
    fn test_load_from_empty_dir_degrades() {
        let dir = TempDir::new().unwrap();
        let service = PredictionService::load(dir.path());
        assert!(!service.is_ready());
        assert!(service.schema().is_none());
        assert!(matches!(
            service.predict_request(&PredictionRequest::example()),
            Err(PipelineError::AssetsNotLoaded(_))
        ));
    }

    #[test]
    fn test_load_from_saved_bundle() {
        let dir = TempDir::new().unwrap();
        tiny_bundle().save(dir.path(), None).unwrap();
        let service = PredictionService::load(dir.path());
        assert!(service.is_ready());
        assert!(service.manifest().is_some());
        assert_eq!(service.schema().unwrap().names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_unknown_schema_still_predicts_with_fill() {
        // none of a, b, c is produced by the feature engineer
        let service = PredictionService::from_bundle(tiny_bundle()).unwrap();
        let result = service.predict(&reading()).unwrap();
        assert!(result.prediction_co_gt.is_finite());
        assert_eq!(result.model_version, MODEL_VERSION);
    }

    #[test]
    fn test_field_named_like_derived_feature_is_accepted() {
        let service = PredictionService::from_bundle(tiny_bundle()).unwrap();
        let mut colliding = reading();
        colliding.set("Day", 3.0);
        colliding.set("IsWeekend", 1.0);
        assert_eq!(
            service.predict(&colliding).unwrap(),
            service.predict(&reading()).unwrap()
        );
    }

    #[test]
    fn test_non_finite_field_is_parse_error() {
        let service = PredictionService::from_bundle(tiny_bundle()).unwrap();
        let bad = Reading::new(parse_timestamp("2025-10-20T18:00:00").unwrap())
            .with_field("T", f64::NAN);
        assert!(matches!(
            service.predict(&bad),
            Err(PipelineError::DataParse(_))
        ));
    }

    #[test]
    fn test_bad_timestamp_is_parse_error() {
        let service = PredictionService::from_bundle(tiny_bundle()).unwrap();
        let mut request = PredictionRequest::example();
        request.date_time = "yesterday at six".to_string();
        assert!(matches!(
            service.predict_request(&request),
            Err(PipelineError::DataParse(_))
        ));
    }
}
