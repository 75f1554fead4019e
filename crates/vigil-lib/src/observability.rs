//! Observability infrastructure for the decision engine
//!
//! Provides:
//! - Prometheus metrics (recommendation latency, per-node failures, fallbacks)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for recommendation latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    recommendation_latency_seconds: Histogram,
    recommendations: IntCounterVec,
    node_inference_failures: IntCounter,
    anomalies_detected: IntCounter,
    optimizer_fallbacks: IntCounter,
    no_candidate_decisions: IntCounter,
    pipeline_degraded: IntCounter,
    nodes_evaluated: IntGauge,
    latency_models_loaded: IntGauge,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            recommendation_latency_seconds: register_histogram!(
                "vigil_recommendation_latency_seconds",
                "Time spent producing one routing decision",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register recommendation_latency_seconds"),

            recommendations: register_int_counter_vec!(
                "vigil_recommendations_total",
                "Routing decisions produced, by decision mode",
                &["mode"]
            )
            .expect("Failed to register recommendations_total"),

            node_inference_failures: register_int_counter!(
                "vigil_node_inference_failures_total",
                "Nodes dropped from a decision because inference failed"
            )
            .expect("Failed to register node_inference_failures_total"),

            anomalies_detected: register_int_counter!(
                "vigil_anomalies_detected_total",
                "Nodes flagged as anomalous"
            )
            .expect("Failed to register anomalies_detected_total"),

            optimizer_fallbacks: register_int_counter!(
                "vigil_optimizer_fallbacks_total",
                "Decisions ranked by raw latency after a cost optimization failure"
            )
            .expect("Failed to register optimizer_fallbacks_total"),

            no_candidate_decisions: register_int_counter!(
                "vigil_no_candidate_decisions_total",
                "Decisions where no node produced a prediction"
            )
            .expect("Failed to register no_candidate_decisions_total"),

            pipeline_degraded: register_int_counter!(
                "vigil_pipeline_degraded_total",
                "Feature batches engineered with missing derived columns"
            )
            .expect("Failed to register pipeline_degraded_total"),

            nodes_evaluated: register_int_gauge!(
                "vigil_nodes_evaluated",
                "Nodes with a prediction in the latest decision"
            )
            .expect("Failed to register nodes_evaluated"),

            latency_models_loaded: register_int_gauge!(
                "vigil_latency_models_loaded",
                "Per-node latency forecasters currently loaded"
            )
            .expect("Failed to register latency_models_loaded"),
        }
    }
}

/// Lightweight handle to the global engine metrics
///
/// Clones share the same underlying collectors.
#[derive(Clone)]
pub struct EngineMetrics {
    inner: &'static EngineMetricsInner,
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    /// Create a handle, registering the collectors on first call
    pub fn new() -> Self {
        Self {
            inner: GLOBAL_METRICS.get_or_init(EngineMetricsInner::new),
        }
    }

    pub fn observe_recommendation_latency(&self, duration_secs: f64) {
        self.inner.recommendation_latency_seconds.observe(duration_secs);
    }

    pub fn inc_recommendations(&self, mode: &str) {
        self.inner.recommendations.with_label_values(&[mode]).inc();
    }

    pub fn inc_node_inference_failures(&self) {
        self.inner.node_inference_failures.inc();
    }

    pub fn inc_anomalies_detected(&self) {
        self.inner.anomalies_detected.inc();
    }

    pub fn inc_optimizer_fallbacks(&self) {
        self.inner.optimizer_fallbacks.inc();
    }

    pub fn inc_no_candidate_decisions(&self) {
        self.inner.no_candidate_decisions.inc();
    }

    pub fn inc_pipeline_degraded(&self) {
        self.inner.pipeline_degraded.inc();
    }

    pub fn set_nodes_evaluated(&self, count: i64) {
        self.inner.nodes_evaluated.set(count);
    }

    pub fn set_latency_models_loaded(&self, count: i64) {
        self.inner.latency_models_loaded.set(count);
    }
}

/// Structured logger for engine events
///
/// Every entry carries an `event` field so JSON logs can be filtered by
/// event type.
#[derive(Clone)]
pub struct StructuredLogger {
    component: String,
}

impl StructuredLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    pub fn log_recommendation(&self, recommended_node: &str, mode: &str, candidates: usize, elapsed_ms: u64) {
        info!(
            event = "recommendation_generated",
            component = %self.component,
            recommended_node = %recommended_node,
            mode = %mode,
            candidates = candidates,
            elapsed_ms = elapsed_ms,
            "Generated routing recommendation"
        );
    }

    pub fn log_node_failure(&self, node_id: &str, adapter: &str, error: &dyn std::error::Error) {
        warn!(
            event = "node_inference_failed",
            component = %self.component,
            node_id = %node_id,
            adapter = %adapter,
            error = %error,
            "Inference failed for node, excluding it from this decision"
        );
    }

    pub fn log_anomaly(&self, node_id: &str, failure_prob: f64) {
        warn!(
            event = "anomaly_detected",
            component = %self.component,
            node_id = %node_id,
            failure_prob = failure_prob,
            "Anomaly detected"
        );
    }

    pub fn log_insufficient_history(&self, node_ids: &[String], min_points: usize) {
        warn!(
            event = "insufficient_history",
            component = %self.component,
            nodes = ?node_ids,
            min_points = min_points,
            "Nodes have fewer samples than the configured history size, rolling features are degraded"
        );
    }

    pub fn log_startup(&self, version: &str, latency_models: usize) {
        info!(
            event = "service_started",
            component = %self.component,
            version = %version,
            latency_models = latency_models,
            "Vigil routing service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            component = %self.component,
            reason = %reason,
            "Vigil routing service shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_metrics_shared_registration() {
        let metrics = EngineMetrics::new();
        let other = EngineMetrics::new();

        metrics.observe_recommendation_latency(0.004);
        metrics.inc_recommendations("cost_weighted");
        metrics.inc_node_inference_failures();
        other.inc_anomalies_detected();
        other.set_nodes_evaluated(3);
        other.set_latency_models_loaded(2);

        assert!(std::ptr::eq(metrics.inner, other.inner));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("decision_engine");
        assert_eq!(logger.component, "decision_engine");
    }
}
