//! Integration tests for the service API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use vigil_lib::config::LatencyBounds;
use vigil_lib::health::HealthRegistry;
use vigil_lib::predictor::{
    AnomalyDetector, FailureClassifier, FnModel, LatencyForecaster, LinearModel, Link,
    ModelContext, StandardScaler,
};
use vigil_lib::{DecisionEngine, EngineConfig, EngineMetrics};
use vigil_service::{
    api::{create_router, AppState},
    config::ServiceConfig,
    initialize,
};

fn write_json(path: &Path, value: Value) {
    fs::write(path, serde_json::to_vec(&value).unwrap()).unwrap();
}

/// Artifact layout over `[cpu_usage, latency_ms, is_high_cpu_usage, error_rate]`
fn write_artifacts(root: &Path) -> ServiceConfig {
    let models = root.join("models");
    let artifacts = root.join("artifacts");
    fs::create_dir_all(&models).unwrap();
    fs::create_dir_all(&artifacts).unwrap();

    write_json(
        &artifacts.join("feature_list.json"),
        json!(["cpu_usage", "latency_ms", "is_high_cpu_usage", "error_rate"]),
    );
    write_json(&artifacts.join("anomaly_threshold.json"), json!(1.0));
    write_json(
        &models.join("anomaly_model.json"),
        json!({"weights": [[0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]], "intercept": [0, 0, 0, 0]}),
    );
    write_json(
        &models.join("anomaly_scaler.json"),
        json!({"mean": [50, 80, 0, 1], "scale": [10, 10, 1, 10]}),
    );
    write_json(
        &models.join("failure_model.json"),
        json!({"weights": [[0, 0, 3, 0]], "intercept": [-1.5], "link": "logistic"}),
    );
    write_json(
        &models.join("failure_scaler.json"),
        json!({"mean": [0, 0, 0, 0], "scale": [1, 1, 1, 1]}),
    );
    // Exogenous inputs: cpu_usage, is_high_cpu_usage, error_rate
    write_json(
        &models.join("latency_model_healthy.json"),
        json!({"weights": [[1, 0, 0]], "intercept": [30]}),
    );
    write_json(
        &models.join("latency_model_failing.json"),
        json!({"weights": [[1, 0, 0]], "intercept": [160]}),
    );

    let mut config = ServiceConfig::default();
    config.engine.artifacts.models_dir = models;
    config.engine.artifacts.artifacts_dir = artifacts;
    config
}

async fn setup_test_app() -> (Router, TempDir) {
    let root = TempDir::new().unwrap();
    let config = write_artifacts(root.path());
    let state = Arc::new(initialize(&config).await);
    (create_router(state), root)
}

async fn setup_unloaded_app() -> Router {
    let root = TempDir::new().unwrap();
    let mut config = ServiceConfig::default();
    config.engine.artifacts.models_dir = root.path().join("missing-models");
    config.engine.artifacts.artifacts_dir = root.path().join("missing-artifacts");
    create_router(Arc::new(initialize(&config).await))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn history(node: &str, breach_last: bool) -> Vec<Value> {
    (0..15)
        .map(|i| {
            let breach = breach_last && i == 14;
            json!({
                "timestamp": format!("2025-10-23T10:{:02}:00Z", i),
                "node_name": node,
                "cpu_usage": if breach { 95.0 } else { 50.0 },
                "memory_usage": 60.0,
                "disk_io": 20.0,
                "latency_ms": if breach { 250.0 } else { 80.0 },
                "block_height_gap": 1,
                "is_healthy": if breach { 0 } else { 1 }
            })
        })
        .collect()
}

#[tokio::test]
async fn test_root_reports_service_info() {
    let (app, _root) = setup_test_app().await;
    let (status, body) = send(app, get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert_eq!(body["endpoints"]["predict"], "/predict");
}

#[tokio::test]
async fn test_healthz_and_readyz_when_loaded() {
    let (app, _root) = setup_test_app().await;

    let (status, health) = send(app.clone(), get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["components"]["artifacts"]["status"], "healthy");

    let (status, readiness) = send(app, get("/readyz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_models_inventory() {
    let (app, _root) = setup_test_app().await;
    let (status, body) = send(app, get("/models")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["latency_models"], json!(["failing", "healthy"]));
    assert_eq!(body["total_latency_models"], 2);
    assert_eq!(body["feature_count"], 4);
    assert_eq!(body["anomaly_model"], "linear");
    assert_eq!(body["config"]["weight_failure"], 0.7);
    assert_eq!(body["config"]["prediction_history_size"], 15);
}

#[tokio::test]
async fn test_predict_prefers_healthy_node() {
    let (app, _root) = setup_test_app().await;

    let mut metrics = history("healthy", false);
    metrics.extend(history("failing", true));
    let (status, body) = send(app, post_json("/predict", json!({ "metrics": metrics }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recommended_node"], "healthy");
    assert_eq!(body["mode"], "cost_weighted");
    assert!(body["timestamp"].is_string());

    let predictions = body["all_predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 2);
    assert_eq!(predictions[0]["node_id"], "failing");
    assert_eq!(predictions[0]["anomaly_detected"], true);
    assert!(predictions[0]["failure_prob"].as_f64().unwrap() > 0.5);
    assert_eq!(predictions[1]["node_id"], "healthy");
    assert_eq!(predictions[1]["predicted_latency_ms"], 80.0);
    assert_eq!(body["recommendation_details"]["node_id"], "healthy");
    assert!(body["explanation"]
        .as_str()
        .unwrap()
        .starts_with("Selected healthy"));
}

#[tokio::test]
async fn test_predict_rejects_empty_batch() {
    let (app, _root) = setup_test_app().await;
    let (status, body) = send(app, post_json("/predict", json!({ "metrics": [] }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "No metrics provided");
}

#[tokio::test]
async fn test_predict_rejects_missing_node_id() {
    let (app, _root) = setup_test_app().await;
    let batch = json!({ "metrics": [{ "timestamp": "2025-10-23T10:00:00Z", "cpu_usage": 50.0 }] });
    let (status, body) = send(app, post_json("/predict", batch)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("node_id"));
}

#[tokio::test]
async fn test_predict_rejects_malformed_json() {
    let (app, _root) = setup_test_app().await;
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from("{\"metrics\": ["))
        .unwrap();
    let (status, _) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unloaded_service_refuses_predictions() {
    let app = setup_unloaded_app().await;

    let (status, body) = send(app.clone(), post_json("/predict", json!({ "metrics": history("n1", false) }))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["detail"], "Models not loaded");

    let (status, _) = send(app.clone(), get("/models")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, health) = send(app.clone(), get("/healthz")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["components"]["artifacts"]["status"], "unhealthy");

    let (status, readiness) = send(app, get("/readyz")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _root) = setup_test_app().await;
    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("vigil_latency_models_loaded"));
}

/// Engine whose anomaly model takes `delay` per call
fn slow_engine(delay: Duration) -> DecisionEngine {
    let features: Arc<[String]> = vec!["cpu_usage".to_string(), "latency_ms".to_string()].into();
    let slow = FnModel::new(move |input: &[f32]| {
        std::thread::sleep(delay);
        Ok(vec![0.0; input.len()])
    });
    let anomaly = AnomalyDetector::new(
        Box::new(slow),
        StandardScaler::identity(features.len()),
        1.0,
        features.clone(),
    )
    .unwrap();
    let failure = FailureClassifier::new(
        Box::new(LinearModel::single(vec![0.0, 0.0], 0.0, Link::Logistic).unwrap()),
        StandardScaler::identity(features.len()),
        features.clone(),
    )
    .unwrap();
    let latency = LatencyForecaster::new(HashMap::new(), features.clone(), LatencyBounds::default());

    let context = ModelContext::new(features, anomaly, failure, latency);
    DecisionEngine::new(Arc::new(context), &EngineConfig::default())
}

#[tokio::test]
async fn test_predict_times_out_on_slow_engine() {
    let state = AppState::new(
        HealthRegistry::new(),
        EngineMetrics::new(),
        Some(Arc::new(slow_engine(Duration::from_millis(300)))),
        Duration::from_millis(20),
    );
    let app = create_router(Arc::new(state));

    let (status, body) = send(app, post_json("/predict", json!({ "metrics": history("n1", false) }))).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["detail"], "Prediction deadline exceeded");
}
