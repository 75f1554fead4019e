//! API client for the Vigil routing service

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// API client for the routing service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// GET a JSON resource, failing on non-2xx responses
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send_get(path).await?;
        Self::parse(response).await
    }

    /// GET a JSON resource, returning the body for any status
    ///
    /// Health endpoints answer 503 with a meaningful body.
    pub async fn get_any_status<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send_get(path).await?;
        response.json().await.context("Failed to parse response")
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    async fn send_get(&self, path: &str) -> Result<Response> {
        let url = self.base_url.join(path).context("Invalid path")?;
        self.client
            .get(url)
            .send()
            .await
            .context("Failed to send request")
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.detail)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, detail);
        }

        response.json().await.context("Failed to parse response")
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: BTreeMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub weight_failure: f64,
    pub weight_latency: f64,
    pub prediction_history_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsInfo {
    pub anomaly_model: String,
    pub failure_model: String,
    pub latency_models: Vec<String>,
    pub total_latency_models: usize,
    pub feature_count: usize,
    pub config: ModelsConfig,
}

/// Body of `POST /predict`; samples are forwarded as given
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsBatch {
    pub metrics: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodePrediction {
    pub node_id: String,
    pub failure_prob: f64,
    pub predicted_latency_ms: f64,
    pub anomaly_detected: bool,
    pub cost_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRecommendation {
    pub recommended_node: String,
    pub explanation: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub mode: String,
    pub all_predictions: Vec<NodePrediction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation_details: Option<NodePrediction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_models() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/models")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "anomaly_model": "onnx",
                    "failure_model": "linear",
                    "latency_models": ["agave_self_hosted"],
                    "total_latency_models": 1,
                    "feature_count": 42,
                    "config": {"weight_failure": 0.7, "weight_latency": 0.3, "prediction_history_size": 15}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let models: ModelsInfo = client.get("models").await.unwrap();

        mock.assert_async().await;
        assert_eq!(models.latency_models, vec!["agave_self_hosted"]);
        assert_eq!(models.feature_count, 42);
    }

    #[tokio::test]
    async fn test_error_detail_surfaces() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predict")
            .with_status(503)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail": "Models not loaded"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let batch = MetricsBatch { metrics: Vec::new() };
        let err = client
            .post::<RoutingRecommendation, _>("predict", &batch)
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("503"));
        assert!(message.contains("Models not loaded"));
    }

    #[tokio::test]
    async fn test_readiness_body_read_on_503() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/readyz")
            .with_status(503)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ready": false, "reason": "Model artifacts not loaded"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let readiness: ReadinessResponse = client.get_any_status("readyz").await.unwrap();
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Model artifacts not loaded"));
    }

    #[test]
    fn test_recommendation_parses_service_response() {
        let body = json!({
            "recommended_node": "healthy",
            "explanation": "Selected healthy with 80ms predicted latency and 11.92% failure risk.",
            "mode": "cost_weighted",
            "all_predictions": [{
                "node_id": "healthy",
                "failure_prob": 0.1192,
                "predicted_latency_ms": 80.0,
                "anomaly_detected": false,
                "cost_score": 0.083
            }],
            "recommendation_details": null,
            "timestamp": "2025-10-23T10:15:00Z"
        });
        let rec: RoutingRecommendation = serde_json::from_value(body).unwrap();
        assert_eq!(rec.recommended_node, "healthy");
        assert!(rec.recommendation_details.is_none());
    }
}
