//! HTTP API: routing predictions, model inventory, health checks and
//! Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use vigil_lib::{
    health::{ComponentStatus, HealthRegistry},
    DecisionEngine, EngineMetrics, NodeMetric, RoutingDecision,
};

pub const SERVICE_NAME: &str = "Vigil ML Prediction Service";
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared application state
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: EngineMetrics,
    /// `None` when the model artifacts failed to load
    pub engine: Option<Arc<DecisionEngine>>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: EngineMetrics,
        engine: Option<Arc<DecisionEngine>>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            engine,
            request_timeout,
        }
    }
}

/// Body of `POST /predict`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsBatch {
    pub metrics: Vec<NodeMetric>,
}

/// Response of `POST /predict`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRecommendation {
    #[serde(flatten)]
    pub decision: RoutingDecision,
    pub timestamp: DateTime<Utc>,
}

/// Errors returned to HTTP clients as `{"detail": ...}`
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotLoaded,
    Timeout,
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            ApiError::NotLoaded => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Models not loaded".to_string(),
            ),
            ApiError::Timeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "Prediction deadline exceeded".to_string(),
            ),
            ApiError::Internal(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "service": SERVICE_NAME,
        "version": SERVICE_VERSION,
        "status": "running",
        "endpoints": {
            "health": "/healthz",
            "ready": "/readyz",
            "metrics": "/metrics",
            "models": "/models",
            "predict": "/predict"
        }
    }))
}

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 once models are loaded
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
async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Internal(format!("Failed to encode metrics: {}", e)))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

/// Loaded models and decision weights
async fn models(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let engine = state.engine.as_ref().ok_or(ApiError::NotLoaded)?;
    let context = engine.context();
    let weights = engine.weights();

    Ok(Json(json!({
        "anomaly_model": context.anomaly().model_kind(),
        "failure_model": context.failure().model_kind(),
        "latency_models": context.latency().nodes(),
        "total_latency_models": context.latency().model_count(),
        "feature_count": context.feature_list().len(),
        "config": {
            "weight_failure": weights.weight_failure,
            "weight_latency": weights.weight_latency,
            "prediction_history_size": engine.history_size()
        }
    })))
}

/// Recommend a node from a batch of recent per-node metrics
async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MetricsBatch>, JsonRejection>,
) -> Result<Json<RoutingRecommendation>, ApiError> {
    let engine = state.engine.clone().ok_or(ApiError::NotLoaded)?;
    let Json(batch) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    if batch.metrics.is_empty() {
        return Err(ApiError::BadRequest("No metrics provided".to_string()));
    }

    info!(samples = batch.metrics.len(), "Received prediction request");

    let task = tokio::task::spawn_blocking(move || engine.decide(&batch.metrics));
    let decision = match tokio::time::timeout(state.request_timeout, task).await {
        Err(_) => {
            warn!(
                timeout_ms = state.request_timeout.as_millis() as u64,
                "Prediction deadline exceeded"
            );
            return Err(ApiError::Timeout);
        }
        Ok(Err(e)) => {
            error!(error = %e, "Prediction task failed");
            return Err(ApiError::Internal(format!("Prediction failed: {}", e)));
        }
        Ok(Ok(Err(e))) => return Err(ApiError::BadRequest(e.to_string())),
        Ok(Ok(Ok(decision))) => decision,
    };

    Ok(Json(RoutingRecommendation {
        decision,
        timestamp: Utc::now(),
    }))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/models", get(models))
        .route("/predict", post(predict))
        .with_state(state)
}

/// Start the API server, returning after `shutdown` resolves
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
