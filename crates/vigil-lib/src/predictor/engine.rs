//! Decision orchestration: per-node inference, optimization, explanation

use super::{AnomalyDetector, FailureClassifier, LatencyForecaster, Predictor};
use crate::config::{EngineConfig, OptimizerConfig};
use crate::error::{NodeInferenceError, PipelineError};
use crate::features::{insufficient_history, FeaturePipeline, FeatureRow, LiveFeatureMap};
use crate::models::{DecisionMode, NodeMetric, NodePrediction, PredictionResult, RoutingDecision};
use crate::observability::{EngineMetrics, StructuredLogger};
use crate::routing::{ExplanationGenerator, RoutingOptimizer, MISSING_COST};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// Models and feature list loaded once at startup
///
/// Read-only after construction, so one instance can back any number of
/// concurrent requests.
pub struct ModelContext {
    feature_list: Arc<[String]>,
    anomaly: AnomalyDetector,
    failure: FailureClassifier,
    latency: LatencyForecaster,
}

impl ModelContext {
    pub fn new(
        feature_list: Arc<[String]>,
        anomaly: AnomalyDetector,
        failure: FailureClassifier,
        latency: LatencyForecaster,
    ) -> Self {
        Self {
            feature_list,
            anomaly,
            failure,
            latency,
        }
    }

    /// Ordered model input columns
    pub fn feature_list(&self) -> &[String] {
        &self.feature_list
    }

    pub fn anomaly(&self) -> &AnomalyDetector {
        &self.anomaly
    }

    pub fn failure(&self) -> &FailureClassifier {
        &self.failure
    }

    pub fn latency(&self) -> &LatencyForecaster {
        &self.latency
    }
}

/// Turns a live feature map into a routing decision
pub struct DecisionEngine {
    context: Arc<ModelContext>,
    pipeline: FeaturePipeline,
    optimizer: RoutingOptimizer,
    explainer: ExplanationGenerator,
    weights: OptimizerConfig,
    history_size: usize,
    metrics: EngineMetrics,
    logger: StructuredLogger,
}

impl DecisionEngine {
    pub fn new(context: Arc<ModelContext>, config: &EngineConfig) -> Self {
        Self {
            context,
            pipeline: FeaturePipeline::new(config.features.clone()),
            optimizer: RoutingOptimizer::new(&config.optimizer, config.latency.penalty_ms),
            explainer: ExplanationGenerator::new(&config.optimizer),
            weights: config.optimizer.clone(),
            history_size: config.history_size(),
            metrics: EngineMetrics::new(),
            logger: StructuredLogger::new("decision_engine"),
        }
    }

    pub fn context(&self) -> &ModelContext {
        &self.context
    }

    pub fn pipeline(&self) -> &FeaturePipeline {
        &self.pipeline
    }

    pub fn weights(&self) -> &OptimizerConfig {
        &self.weights
    }

    /// Minimum samples per node before a history warning is raised
    pub fn history_size(&self) -> usize {
        self.history_size
    }

    /// Run all three adapters for one node
    pub fn predict_node(
        &self,
        node_id: &str,
        row: &FeatureRow,
    ) -> Result<PredictionResult, NodeInferenceError> {
        let anomaly = run_adapter(&self.context.anomaly, row)?;
        let failure_prob = run_adapter(&self.context.failure, row)?;
        let predicted_latency_ms = run_adapter(&self.context.latency, row)?;

        debug!(
            node_id = %node_id,
            reconstruction_error = anomaly.reconstruction_error,
            failure_prob = failure_prob,
            predicted_latency_ms = predicted_latency_ms,
            "Node inference completed"
        );

        Ok(PredictionResult {
            node_id: node_id.to_string(),
            failure_prob,
            predicted_latency_ms,
            anomaly_detected: anomaly.is_anomaly(),
        })
    }

    /// Produce a decision from the latest engineered row of each node
    ///
    /// Never fails: nodes whose inference errors are dropped, and an empty
    /// candidate set yields the no-candidates sentinel.
    pub fn recommend(&self, live: &LiveFeatureMap) -> RoutingDecision {
        let start = Instant::now();

        let mut results = Vec::with_capacity(live.len());
        for (node_id, row) in live {
            match self.predict_node(node_id, row) {
                Ok(result) => {
                    if result.anomaly_detected {
                        self.metrics.inc_anomalies_detected();
                        self.logger.log_anomaly(node_id, result.failure_prob);
                    }
                    results.push(result);
                }
                Err(e) => {
                    self.metrics.inc_node_inference_failures();
                    self.logger.log_node_failure(node_id, e.adapter, &e.source);
                }
            }
        }
        self.metrics.set_nodes_evaluated(results.len() as i64);

        if results.is_empty() {
            error!(
                requested = live.len(),
                "No predictions generated, cannot optimize"
            );
            self.metrics.inc_no_candidate_decisions();
            self.metrics.observe_recommendation_latency(start.elapsed().as_secs_f64());
            return RoutingDecision::no_candidates();
        }

        let node_ids: Vec<String> = results.iter().map(|r| r.node_id.clone()).collect();
        let failure_probs: BTreeMap<String, f64> = results
            .iter()
            .map(|r| (r.node_id.clone(), r.failure_prob))
            .collect();
        let latencies: BTreeMap<String, f64> = results
            .iter()
            .map(|r| (r.node_id.clone(), r.predicted_latency_ms))
            .collect();

        let optimization = self.optimizer.optimize(&failure_probs, &latencies, &node_ids);
        if optimization.mode == DecisionMode::LatencyFallback {
            self.metrics.inc_optimizer_fallbacks();
        }

        let mut all_predictions: Vec<NodePrediction> = results
            .into_iter()
            .map(|r| {
                let cost = optimization
                    .costs
                    .get(&r.node_id)
                    .copied()
                    .unwrap_or(MISSING_COST);
                NodePrediction::from_result(r, cost)
            })
            .collect();
        all_predictions.sort_by(|a, b| a.node_id.cmp(&b.node_id));

        let recommendation_details = all_predictions
            .iter()
            .find(|p| p.node_id == optimization.best_node)
            .cloned();

        let explanation = match &recommendation_details {
            Some(details) => self
                .explainer
                .explain(details, &all_predictions, optimization.mode),
            None => format!(
                "Selected {} but no prediction details are available.",
                optimization.best_node
            ),
        };

        let elapsed = start.elapsed();
        self.metrics.observe_recommendation_latency(elapsed.as_secs_f64());
        self.metrics.inc_recommendations(optimization.mode.as_str());
        self.logger.log_recommendation(
            &optimization.best_node,
            optimization.mode.as_str(),
            all_predictions.len(),
            elapsed.as_millis() as u64,
        );

        RoutingDecision {
            recommended_node: optimization.best_node,
            explanation,
            mode: optimization.mode,
            all_predictions,
            recommendation_details,
        }
    }

    /// Engineer features from a raw batch and decide
    ///
    /// Schema problems in the batch are the only error surfaced.
    pub fn decide(&self, samples: &[NodeMetric]) -> Result<RoutingDecision, PipelineError> {
        let table = self.pipeline.engineer(samples)?;
        if table.is_degraded() {
            self.metrics.inc_pipeline_degraded();
        }

        let short = insufficient_history(&table, self.history_size);
        if !short.is_empty() {
            self.logger.log_insufficient_history(&short, self.history_size);
        }

        Ok(self.recommend(&table.latest_rows()))
    }
}

fn run_adapter<P: Predictor>(adapter: &P, row: &FeatureRow) -> Result<P::Output, NodeInferenceError> {
    adapter.predict(row).map_err(|source| NodeInferenceError {
        adapter: adapter.name(),
        source,
    })
}
