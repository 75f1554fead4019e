//! Fixtures shared by the engine integration tests

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use vigil_lib::config::LatencyBounds;
use vigil_lib::predictor::{
    exogenous_features, AnomalyDetector, FailureClassifier, LatencyForecaster, LinearModel, Link,
    Model, ModelContext, StandardScaler,
};
use vigil_lib::NodeMetric;

pub const FEATURES: [&str; 11] = [
    "cpu_usage",
    "memory_usage",
    "disk_io",
    "error_rate",
    "block_height_gap",
    "latency_ms",
    "is_high_cpu_usage",
    "is_high_memory_usage",
    "is_high_disk_io",
    "is_high_error_rate",
    "is_high_block_height_gap",
];

/// Raw values of a healthy node, in `FEATURES` order
pub const HEALTHY_ROW: [f64; 11] = [50.0, 60.0, 20.0, 1.0, 1.0, 80.0, 0.0, 0.0, 0.0, 0.0, 0.0];

pub fn feature_list() -> Arc<[String]> {
    FEATURES.iter().map(|f| f.to_string()).collect::<Vec<_>>().into()
}

/// Weight vector over `names` with the given non-zero entries
pub fn weights(names: &[String], entries: &[(&str, f64)]) -> Vec<f64> {
    names
        .iter()
        .map(|name| {
            entries
                .iter()
                .find(|(n, _)| *n == name.as_str())
                .map(|(_, w)| *w)
                .unwrap_or(0.0)
        })
        .collect()
}

/// Reconstructs every input as zero after centering on the healthy row
pub fn anomaly_detector(features: Arc<[String]>) -> AnomalyDetector {
    let n = features.len();
    let model = LinearModel::new(vec![vec![0.0; n]; n], vec![0.0; n], Link::Identity).unwrap();
    let scaler = StandardScaler::new(HEALTHY_ROW.to_vec(), vec![10.0; n]).unwrap();
    AnomalyDetector::new(Box::new(model), scaler, 1.0, features).unwrap()
}

/// Logistic model firing on the threshold indicators
pub fn failure_classifier(features: Arc<[String]>) -> FailureClassifier {
    let w = weights(
        &features,
        &[
            ("is_high_cpu_usage", 1.0),
            ("is_high_memory_usage", 1.0),
            ("is_high_disk_io", 1.0),
            ("is_high_error_rate", 1.0),
            ("is_high_block_height_gap", 1.0),
        ],
    );
    let model = LinearModel::single(w, -2.0, Link::Logistic).unwrap();
    FailureClassifier::new(
        Box::new(model),
        StandardScaler::identity(features.len()),
        features,
    )
    .unwrap()
}

/// `latency = base + cpu_usage` for each `(node_id, base)`
pub fn latency_forecaster(features: &[String], nodes: &[(&str, f64)]) -> LatencyForecaster {
    let exog: Arc<[String]> = exogenous_features(features, "latency_ms").into();
    let models: HashMap<String, Box<dyn Model>> = nodes
        .iter()
        .map(|(node, base)| {
            let model = LinearModel::single(weights(&exog, &[("cpu_usage", 1.0)]), *base, Link::Identity)
                .unwrap();
            (node.to_string(), Box::new(model) as Box<dyn Model>)
        })
        .collect();
    LatencyForecaster::new(models, exog, LatencyBounds::default())
}

pub fn context(latency_nodes: &[(&str, f64)]) -> ModelContext {
    let features = feature_list();
    ModelContext::new(
        features.clone(),
        anomaly_detector(features.clone()),
        failure_classifier(features.clone()),
        latency_forecaster(&features, latency_nodes),
    )
}

pub fn ts(minute: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_761_213_600 + minute * 60, 0).unwrap()
}

/// Flat healthy history of `points` samples
pub fn healthy_history(node: &str, points: i64) -> Vec<NodeMetric> {
    (0..points)
        .map(|i| NodeMetric {
            timestamp: Some(ts(i)),
            node_id: Some(node.to_string()),
            cpu_usage: Some(50.0),
            memory_usage: Some(60.0),
            disk_io: Some(20.0),
            latency_ms: Some(80.0),
            block_height_gap: Some(1.0),
            error_rate: Some(1.0),
            is_healthy: Some(1.0),
            ..Default::default()
        })
        .collect()
}

/// Healthy history whose last sample breaches every threshold
pub fn failing_history(node: &str, points: i64) -> Vec<NodeMetric> {
    let mut history = healthy_history(node, points);
    if let Some(last) = history.last_mut() {
        last.cpu_usage = Some(90.0);
        last.memory_usage = Some(95.0);
        last.disk_io = Some(80.0);
        last.error_rate = Some(15.0);
        last.block_height_gap = Some(10.0);
        last.latency_ms = Some(250.0);
    }
    history
}
