//! HTTP API: prediction, health checks and Prometheus metrics

use crate::config::ErrorStatusMode;
use aq_lib::{
    health::{components, ComponentStatus, HealthRegistry},
    observability::{encode_metrics, PredictorMetrics, StructuredLogger},
    PipelineError, PredictionRequest, Predictor,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

pub const WELCOME_MESSAGE: &str =
    "Welcome to the Air Quality CO Prediction API. POST sensor readings to /predict.";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<dyn Predictor>,
    pub health_registry: HealthRegistry,
    pub metrics: PredictorMetrics,
    pub logger: StructuredLogger,
    pub error_status: ErrorStatusMode,
}

impl AppState {
    pub fn new(
        predictor: Arc<dyn Predictor>,
        health_registry: HealthRegistry,
        metrics: PredictorMetrics,
        logger: StructuredLogger,
        error_status: ErrorStatusMode,
    ) -> Self {
        Self {
            predictor,
            health_registry,
            metrics,
            logger,
            error_status,
        }
    }

    /// Build the state and publish the predictor's startup condition to the
    /// health registry and metrics
    pub async fn initialize(
        predictor: Arc<dyn Predictor>,
        error_status: ErrorStatusMode,
        logger: StructuredLogger,
    ) -> Arc<Self> {
        let health_registry = HealthRegistry::new();
        let metrics = PredictorMetrics::new();

        health_registry.register(components::PREDICTOR).await;
        if predictor.is_ready() {
            health_registry.set_healthy(components::ARTIFACTS).await;
        } else {
            health_registry
                .set_unhealthy(components::ARTIFACTS, "model artifacts not loaded")
                .await;
        }
        metrics.set_assets_loaded(predictor.is_ready());
        metrics.set_model_version(predictor.model_version());
        health_registry.set_ready(true).await;

        Arc::new(Self::new(
            predictor,
            health_registry,
            metrics,
            logger,
            error_status,
        ))
    }

    fn status_for(&self, http_status: StatusCode) -> StatusCode {
        match self.error_status {
            ErrorStatusMode::Http => http_status,
            ErrorStatusMode::AlwaysOk => StatusCode::OK,
        }
    }
}

/// `{"message": ...}` body of the root endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct WelcomeResponse {
    pub message: String,
}

/// `{"error": ...}` body of every failed request
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Status code a pipeline error maps to in HTTP mode
pub fn http_status(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::AssetsNotLoaded(_) => StatusCode::SERVICE_UNAVAILABLE,
        e if e.is_client_error() => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse { error: message })).into_response()
}

async fn root() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: WELCOME_MESSAGE.to_string(),
    })
}

/// Predict CO for one reading
async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let message = rejection.body_text();
            state.metrics.inc_prediction_errors("invalid_body");
            state.logger.log_prediction_failed("invalid_body", &message);
            return error_response(state.status_for(rejection.status()), message);
        }
    };

    match state.predictor.predict_request(&request) {
        Ok(result) => {
            let elapsed = started.elapsed().as_secs_f64();
            state.metrics.observe_prediction_latency(elapsed);
            state.metrics.record_prediction(result.is_out_of_distribution);
            state.logger.log_prediction(
                result.prediction_co_gt,
                result.is_out_of_distribution,
                elapsed,
            );
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(e) => {
            state.metrics.inc_prediction_errors(e.kind());
            state.logger.log_prediction_failed(e.kind(), &e.to_string());
            error_response(state.status_for(http_status(&e)), e.to_string())
        }
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    match encode_metrics() {
        Ok(buffer) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/predict", post(predict))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
