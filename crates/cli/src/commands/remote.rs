//! Commands talking to a running prediction server

use anyhow::Result;
use aq_lib::{ComponentStatus, PredictionRequest};
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::commands::predict::print_prediction;
use crate::output::{
    color_status, print_heading, print_info, print_json, print_table, print_warning, Field,
    OutputFormat,
};
use aq_lib::{HealthResponse, ReadinessResponse};

/// Row for the component health table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

#[derive(Serialize)]
struct StatusOutput {
    api_url: String,
    message: Option<String>,
    health: Option<HealthResponse>,
    readiness: Option<ReadinessResponse>,
}

fn status_label(status: ComponentStatus) -> &'static str {
    match status {
        ComponentStatus::Healthy => "healthy",
        ComponentStatus::Degraded => "degraded",
        ComponentStatus::Unhealthy => "unhealthy",
    }
}

/// Send one request to `POST /predict`
pub async fn query(
    client: &ApiClient,
    request: &PredictionRequest,
    format: OutputFormat,
) -> Result<()> {
    let result = client.predict(request).await?;
    print_prediction(request, &result, format)
}

/// Show the server's welcome message, health and readiness
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let message = client.welcome().await.ok().map(|w| w.message);
    let (_, health) = client.health().await?;
    let (_, readiness) = client.readiness().await?;

    let output = StatusOutput {
        api_url: client.base_url().to_string(),
        message,
        health,
        readiness,
    };

    match format {
        OutputFormat::Json => print_json(&output)?,
        OutputFormat::Table => print_status(&output),
    }
    Ok(())
}

fn print_status(output: &StatusOutput) {
    print_heading("Server Status");
    println!("API:     {}", output.api_url.cyan());
    if let Some(message) = &output.message {
        println!("Message: {}", message);
    }

    let Some(health) = &output.health else {
        print_warning("Health endpoint returned no usable body");
        return;
    };
    println!("Health:  {}", color_status(status_label(health.status)));
    match &output.readiness {
        Some(r) if r.ready => println!("Ready:   {}", color_status("ready")),
        Some(r) => println!(
            "Ready:   {} ({})",
            color_status("not ready"),
            r.reason.as_deref().unwrap_or("no reason given")
        ),
        None => print_warning("Readiness endpoint returned no usable body"),
    }
    println!();

    let mut rows: Vec<ComponentRow> = health
        .components
        .iter()
        .map(|(name, c)| ComponentRow {
            name: name.clone(),
            status: color_status(status_label(c.status)),
            message: c.message.clone().unwrap_or_default(),
        })
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    print_table(rows);

    if health.status == ComponentStatus::Unhealthy {
        print_info("Run `aqp train` and restart the server to load model artifacts");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_tolerates_unhealthy_server() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/")
            .with_status(200)
            .with_body(r#"{"message": "Welcome"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/healthz")
            .with_status(503)
            .with_body(r#"{"status": "unhealthy", "components": {}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/readyz")
            .with_status(503)
            .with_body(concat!(
                r#"{"ready": false, "#,
                r#""reason": "artifacts unhealthy: model artifacts not loaded"}"#
            ))
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        assert!(show_status(&client, OutputFormat::Json).await.is_ok());
    }

    #[tokio::test]
    async fn test_query_propagates_server_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predict")
            .with_status(422)
            .with_body(r#"{"error": "Failed to parse input data: unrecognised timestamp 'x'"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = query(&client, &PredictionRequest::example(), OutputFormat::Table)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unrecognised timestamp"));
    }
}
