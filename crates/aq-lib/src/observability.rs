//! Observability for training and serving
//!
//! Provides:
//! - Prometheus metrics (prediction latency, prediction/OOD/error counts, asset state)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, Encoder, GaugeVec, Histogram, IntCounter, IntCounterVec, IntGauge,
    TextEncoder,
};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Histogram buckets for prediction latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PredictorMetricsInner> = OnceLock::new();

struct PredictorMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounter,
    ood_predictions_total: IntCounter,
    prediction_errors_total: IntCounterVec,
    assets_loaded: IntGauge,
    model_version_info: GaugeVec,
}

impl PredictorMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "aq_prediction_latency_seconds",
                "Time spent turning one reading into a prediction",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter!(
                "aq_predictions_total",
                "Predictions served successfully"
            )
            .expect("Failed to register predictions_total"),

            ood_predictions_total: register_int_counter!(
                "aq_ood_predictions_total",
                "Predictions whose input was flagged out of distribution"
            )
            .expect("Failed to register ood_predictions_total"),

            prediction_errors_total: register_int_counter_vec!(
                "aq_prediction_errors_total",
                "Failed prediction requests by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors_total"),

            assets_loaded: register_int_gauge!(
                "aq_assets_loaded",
                "1 when the model artifacts were loaded at startup"
            )
            .expect("Failed to register assets_loaded"),

            model_version_info: register_gauge_vec!(
                "aq_model_version_info",
                "Version of the loaded model",
                &["version"]
            )
            .expect("Failed to register model_version_info"),
        }
    }
}

/// Handle to the process-wide prediction metrics
///
/// Clones share the same underlying collectors.
#[derive(Clone)]
pub struct PredictorMetrics {
    _private: (),
}

impl Default for PredictorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictorMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PredictorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PredictorMetricsInner {
        GLOBAL_METRICS.get_or_init(PredictorMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    /// Count a successful prediction and whether it was out of distribution
    pub fn record_prediction(&self, out_of_distribution: bool) {
        self.inner().predictions_total.inc();
        if out_of_distribution {
            self.inner().ood_predictions_total.inc();
        }
    }

    pub fn inc_prediction_errors(&self, kind: &str) {
        self.inner()
            .prediction_errors_total
            .with_label_values(&[kind])
            .inc();
    }

    pub fn set_assets_loaded(&self, loaded: bool) {
        self.inner().assets_loaded.set(i64::from(loaded));
    }

    pub fn set_model_version(&self, version: &str) {
        self.inner().model_version_info.reset();
        self.inner()
            .model_version_info
            .with_label_values(&[version])
            .set(1.0);
    }
}

/// Render the default registry in the Prometheus text format
pub fn encode_metrics() -> Result<Vec<u8>, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    Ok(buffer)
}

/// Structured logger for pipeline events
///
/// Every line carries an `event` field and the emitting service name.
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_startup(&self, version: &str, model_version: &str) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            model_version = %model_version,
            "Air quality predictor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Air quality predictor shutting down"
        );
    }

    pub fn log_assets_loaded(&self, models_dir: &Path, n_features: usize) {
        info!(
            event = "assets_loaded",
            service = %self.service,
            models_dir = %models_dir.display(),
            n_features = n_features,
            "Model artifacts loaded"
        );
    }

    /// Startup continued without a usable model
    pub fn log_assets_missing(&self, models_dir: &Path, reason: &str) {
        error!(
            event = "assets_missing",
            service = %self.service,
            models_dir = %models_dir.display(),
            reason = %reason,
            "Model artifacts unavailable, predictions will fail until retrained"
        );
    }

    pub fn log_prediction(&self, prediction: f64, out_of_distribution: bool, latency_secs: f64) {
        if out_of_distribution {
            warn!(
                event = "prediction_served",
                service = %self.service,
                prediction_co_gt = prediction,
                out_of_distribution = true,
                latency_secs = latency_secs,
                "Prediction served for out-of-distribution input"
            );
        } else {
            info!(
                event = "prediction_served",
                service = %self.service,
                prediction_co_gt = prediction,
                out_of_distribution = false,
                latency_secs = latency_secs,
                "Prediction served"
            );
        }
    }

    pub fn log_prediction_failed(&self, kind: &str, message: &str) {
        warn!(
            event = "prediction_failed",
            service = %self.service,
            kind = %kind,
            error = %message,
            "Prediction request failed"
        );
    }

    pub fn log_training_summary(
        &self,
        rows_used: usize,
        outliers_removed: usize,
        r2: f64,
        mae: f64,
        rmse: f64,
    ) {
        info!(
            event = "training_completed",
            service = %self.service,
            rows_used = rows_used,
            outliers_removed = outliers_removed,
            r2 = r2,
            mae = mae,
            rmse = rmse,
            "Training run finished"
        );
    }
}
