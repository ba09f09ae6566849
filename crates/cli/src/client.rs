//! API client for a running prediction server

use anyhow::{Context, Result};
use aq_lib::{HealthResponse, PredictionResult, ReadinessResponse};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the prediction server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Make a GET request, failing on a non-success status
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let (status, body) = self.get_any_status::<T>(path).await?;
        match body {
            Some(body) if status.is_success() => Ok(body),
            _ => anyhow::bail!("API error ({})", status),
        }
    }

    /// Make a GET request and decode the body whatever the status;
    /// health checks answer 503 with a JSON body
    pub async fn get_any_status<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<(StatusCode, Option<T>)> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let text = response.text().await.context("Failed to read response")?;
        Ok((status, serde_json::from_str(&text).ok()))
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Score one request on the server
    pub async fn predict<B: Serialize>(&self, request: &B) -> Result<PredictionResult> {
        match self.post::<PredictResponse, _>("predict", request).await? {
            PredictResponse::Prediction(result) => Ok(result),
            // servers in always-ok mode report errors with a 200
            PredictResponse::Error(e) => anyhow::bail!("API error: {}", e.error),
        }
    }

    pub async fn welcome(&self) -> Result<WelcomeResponse> {
        self.get("").await
    }

    pub async fn health(&self) -> Result<(StatusCode, Option<HealthResponse>)> {
        self.get_any_status("healthz").await
    }

    pub async fn readiness(&self) -> Result<(StatusCode, Option<ReadinessResponse>)> {
        self.get_any_status("readyz").await
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum PredictResponse {
    Prediction(PredictionResult),
    Error(ErrorResponse),
}
