//! Human-readable decision explanations

use crate::config::OptimizerConfig;
use crate::models::{DecisionMode, NodePrediction};

/// Deterministic prose summary of a routing decision
///
/// The text is for operators only; clients needing structured data read
/// the prediction table of the decision.
pub struct ExplanationGenerator {
    weight_failure: f64,
    weight_latency: f64,
    downstream_policy: Option<String>,
}

impl ExplanationGenerator {
    pub fn new(config: &OptimizerConfig) -> Self {
        Self {
            weight_failure: config.weight_failure,
            weight_latency: config.weight_latency,
            downstream_policy: config.downstream_policy.clone(),
        }
    }

    pub fn explain(
        &self,
        recommended: &NodePrediction,
        all: &[NodePrediction],
        mode: DecisionMode,
    ) -> String {
        let mut text = format!(
            "Selected {} with {:.0}ms predicted latency and {:.2}% failure risk.",
            recommended.node_id,
            recommended.predicted_latency_ms,
            recommended.failure_prob * 100.0
        );

        if recommended.anomaly_detected {
            text.push_str(" Warning: anomaly detected on this node.");
        }

        if let Some(next) = next_best(recommended, all) {
            let delta = next.predicted_latency_ms - recommended.predicted_latency_ms;
            if delta >= 0.0 {
                text.push_str(&format!(
                    " {:.0}ms faster than next best ({}).",
                    delta, next.node_id
                ));
            } else {
                text.push_str(&format!(
                    " {:.0}ms slower than next best ({}) but lower overall cost.",
                    -delta, next.node_id
                ));
            }
        }

        match mode {
            DecisionMode::CostWeighted => text.push_str(&format!(
                " Ranked by cost: {:.0}% failure risk, {:.0}% normalized latency.",
                self.weight_failure * 100.0,
                self.weight_latency * 100.0
            )),
            DecisionMode::LatencyFallback => {
                text.push_str(" Cost ranking unavailable, ranked by raw predicted latency.")
            }
            DecisionMode::NoCandidates => {}
        }

        if let Some(policy) = &self.downstream_policy {
            text.push_str(" Note: ");
            text.push_str(policy);
        }

        text
    }
}

/// Lowest-cost node other than the recommended one
fn next_best<'a>(recommended: &NodePrediction, all: &'a [NodePrediction]) -> Option<&'a NodePrediction> {
    all.iter()
        .filter(|p| p.node_id != recommended.node_id)
        .min_by(|a, b| {
            a.cost_score
                .total_cmp(&b.cost_score)
                .then_with(|| a.node_id.cmp(&b.node_id))
        })
}
