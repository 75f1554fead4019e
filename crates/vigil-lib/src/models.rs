//! Core data models for the routing engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Node identifier returned when no node produced a prediction
pub const NO_NODES_AVAILABLE: &str = "no_nodes_available";

/// Named numeric metrics carried by every sample
pub const BASE_METRICS: [&str; 7] = [
    "cpu_usage",
    "memory_usage",
    "disk_io",
    "latency_ms",
    "block_height_gap",
    "error_rate",
    "is_healthy",
];

/// One telemetry observation for one node at one instant
///
/// Fields are optional on the wire so the feature pipeline can report which
/// required column is missing instead of failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeMetric {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "node_id_as_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub node_id: Option<String>,
    /// Name reported by the data collector, used when `node_id` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_usage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_usage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_io: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_height_gap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_rate: Option<f64>,
    /// 1 for healthy, 0 for unhealthy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_healthy: Option<f64>,
    /// Any additional numeric metrics
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl NodeMetric {
    /// Effective node identity: `node_id`, falling back to `node_name`
    pub fn node_key(&self) -> Option<&str> {
        self.node_id.as_deref().or(self.node_name.as_deref())
    }

    /// Value of a named metric, including numeric extras
    pub fn metric(&self, name: &str) -> Option<f64> {
        match name {
            "cpu_usage" => self.cpu_usage,
            "memory_usage" => self.memory_usage,
            "disk_io" => self.disk_io,
            "latency_ms" => self.latency_ms,
            "block_height_gap" => self.block_height_gap,
            "error_rate" => self.error_rate,
            "is_healthy" => self.is_healthy,
            other => self.extra.get(other).and_then(|v| v.as_f64()),
        }
    }

    /// Names of the numeric extras carried by this sample
    pub fn extra_metric_names(&self) -> impl Iterator<Item = &str> {
        self.extra
            .iter()
            .filter(|(_, v)| v.is_number())
            .map(|(k, _)| k.as_str())
    }
}

/// Node identity is opaque text. A numeric id on the wire keeps its textual
/// form and is never reinterpreted.
fn node_id_as_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Model outputs for one node within one decision request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub node_id: String,
    pub failure_prob: f64,
    pub predicted_latency_ms: f64,
    pub anomaly_detected: bool,
}

/// Prediction result with the cost assigned by the optimizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePrediction {
    pub node_id: String,
    /// Probability of failure (0-1)
    pub failure_prob: f64,
    pub predicted_latency_ms: f64,
    pub anomaly_detected: bool,
    /// Combined cost, lower is better
    pub cost_score: f64,
}

impl NodePrediction {
    pub fn from_result(result: PredictionResult, cost_score: f64) -> Self {
        Self {
            node_id: result.node_id,
            failure_prob: result.failure_prob,
            predicted_latency_ms: result.predicted_latency_ms,
            anomaly_detected: result.anomaly_detected,
            cost_score,
        }
    }
}

/// How the cost scores in a decision were produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionMode {
    /// Weighted failure probability plus normalized latency
    CostWeighted,
    /// Optimizer failed; cost scores are raw predicted latencies
    LatencyFallback,
    /// No node produced a prediction
    NoCandidates,
}

impl DecisionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionMode::CostWeighted => "cost_weighted",
            DecisionMode::LatencyFallback => "latency_fallback",
            DecisionMode::NoCandidates => "no_candidates",
        }
    }
}

/// Terminal output of one recommendation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub recommended_node: String,
    pub explanation: String,
    pub mode: DecisionMode,
    /// Ordered by node id
    pub all_predictions: Vec<NodePrediction>,
    pub recommendation_details: Option<NodePrediction>,
}

impl RoutingDecision {
    /// Decision returned when every node failed inference
    pub fn no_candidates() -> Self {
        Self {
            recommended_node: NO_NODES_AVAILABLE.to_string(),
            explanation: "No nodes were available for prediction.".to_string(),
            mode: DecisionMode::NoCandidates,
            all_predictions: Vec::new(),
            recommendation_details: None,
        }
    }

    pub fn has_candidates(&self) -> bool {
        self.mode != DecisionMode::NoCandidates
    }

    pub fn prediction(&self, node_id: &str) -> Option<&NodePrediction> {
        self.all_predictions.iter().find(|p| p.node_id == node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_node_id_kept_as_text() {
        let json = r#"{"timestamp": "2025-10-23T10:00:00Z", "node_id": 7, "cpu_usage": 50.0}"#;
        let metric: NodeMetric = serde_json::from_str(json).unwrap();
        assert_eq!(metric.node_id.as_deref(), Some("7"));

        let json = r#"{"timestamp": "2025-10-23T10:00:00Z", "node_id": "007"}"#;
        let metric: NodeMetric = serde_json::from_str(json).unwrap();
        assert_eq!(metric.node_id.as_deref(), Some("007"));
    }

    #[test]
    fn test_node_name_fallback() {
        let json = r#"{"timestamp": "2025-10-23T10:00:00Z", "node_name": "helius_devnet"}"#;
        let metric: NodeMetric = serde_json::from_str(json).unwrap();
        assert_eq!(metric.node_key(), Some("helius_devnet"));
    }

    #[test]
    fn test_extra_metrics_collected() {
        let json = r#"{"node_id": "a", "slot_lag": 3.5, "region": "eu"}"#;
        let metric: NodeMetric = serde_json::from_str(json).unwrap();
        assert_eq!(metric.metric("slot_lag"), Some(3.5));
        assert_eq!(metric.metric("region"), None);
        assert_eq!(metric.extra_metric_names().collect::<Vec<_>>(), vec!["slot_lag"]);
    }

    #[test]
    fn test_no_candidates_decision() {
        let decision = RoutingDecision::no_candidates();
        assert_eq!(decision.recommended_node, NO_NODES_AVAILABLE);
        assert!(!decision.has_candidates());
        assert!(decision.all_predictions.is_empty());
        assert_eq!(
            serde_json::to_value(decision.mode).unwrap(),
            serde_json::json!("no_candidates")
        );
    }
}
