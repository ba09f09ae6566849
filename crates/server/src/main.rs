//! Air-quality prediction server
//!
//! Loads the trained artifacts once at startup and serves CO predictions
//! over HTTP. Missing artifacts do not stop the server; predictions fail
//! with an explanatory error until the model is trained.

use anyhow::Result;
use aq_lib::{observability::StructuredLogger, PredictionService, Predictor};
use aq_server::{api, config::ServerConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting aq-server");

    let config = ServerConfig::load()?;
    info!(
        api_port = config.api_port,
        models_dir = %config.models_dir.display(),
        error_status = ?config.error_status,
        "Server configured"
    );

    let logger = StructuredLogger::new("aq-server");
    let service = PredictionService::load(&config.models_dir);
    match service.degraded_reason() {
        Some(reason) => logger.log_assets_missing(&config.models_dir, reason),
        None => logger.log_assets_loaded(
            &config.models_dir,
            service.schema().map(|s| s.len()).unwrap_or(0),
        ),
    }
    logger.log_startup(SERVER_VERSION, service.model_version());

    let predictor: Arc<dyn Predictor> = Arc::new(service);
    let state = api::AppState::initialize(predictor, config.error_status, logger.clone()).await;

    let server = tokio::spawn(api::serve(config.api_port, state));

    tokio::select! {
        joined = server => {
            joined??;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }
    info!("Shutting down");

    Ok(())
}
