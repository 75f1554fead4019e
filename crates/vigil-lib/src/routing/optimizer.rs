//! Weighted cost optimization over candidate nodes
//!
//! `cost = w_failure * failure_prob + w_latency * normalized_latency`,
//! where latency is min-max normalized across the candidate set. Any
//! internal inconsistency switches to ranking by raw predicted latency and
//! the decision is labelled with [`DecisionMode::LatencyFallback`].

use crate::config::OptimizerConfig;
use crate::error::OptimizeError;
use crate::models::{DecisionMode, NO_NODES_AVAILABLE};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Cost attached to a prediction the optimizer did not score
pub const MISSING_COST: f64 = 999.0;

/// Selected node and the cost of every candidate
#[derive(Debug, Clone, PartialEq)]
pub struct Optimization {
    pub best_node: String,
    pub costs: BTreeMap<String, f64>,
    pub mode: DecisionMode,
}

pub struct RoutingOptimizer {
    weight_failure: f64,
    weight_latency: f64,
    penalty_ms: f64,
}

impl RoutingOptimizer {
    /// `penalty_ms` is the cost reported for nodes without a latency in
    /// the fallback path
    pub fn new(config: &OptimizerConfig, penalty_ms: f64) -> Self {
        Self {
            weight_failure: config.weight_failure,
            weight_latency: config.weight_latency,
            penalty_ms,
        }
    }

    /// Pick the lowest-cost node; ties go to the smallest node id
    pub fn optimize(
        &self,
        failure_probs: &BTreeMap<String, f64>,
        latencies: &BTreeMap<String, f64>,
        node_ids: &[String],
    ) -> Optimization {
        if node_ids.is_empty() {
            warn!("No candidate nodes to optimize");
            return Optimization {
                best_node: NO_NODES_AVAILABLE.to_string(),
                costs: BTreeMap::new(),
                mode: DecisionMode::NoCandidates,
            };
        }

        match self.cost_weighted(failure_probs, latencies, node_ids) {
            Ok(optimization) => optimization,
            Err(e) => {
                warn!(
                    event = "optimizer_fallback",
                    error = %e,
                    "Cost optimization failed, falling back to lowest latency"
                );
                self.latency_fallback(latencies, node_ids)
            }
        }
    }

    /// Weighted cost ranking, failing on any missing or non-finite input
    pub fn cost_weighted(
        &self,
        failure_probs: &BTreeMap<String, f64>,
        latencies: &BTreeMap<String, f64>,
        node_ids: &[String],
    ) -> Result<Optimization, OptimizeError> {
        let mut candidate_latency = BTreeMap::new();
        for id in node_ids {
            let latency = latencies.get(id).ok_or_else(|| OptimizeError::MissingEntry {
                kind: "latency",
                node_id: id.clone(),
            })?;
            candidate_latency.insert(id.clone(), *latency);
        }
        let normalized = normalize(&candidate_latency);

        let mut costs = BTreeMap::new();
        for id in node_ids {
            let failure = failure_probs.get(id).ok_or_else(|| OptimizeError::MissingEntry {
                kind: "failure",
                node_id: id.clone(),
            })?;
            let cost = self.weight_failure * failure + self.weight_latency * normalized[id];
            if !cost.is_finite() {
                return Err(OptimizeError::NonFinite(id.clone()));
            }
            costs.insert(id.clone(), cost);
        }

        let best_node = arg_min(&costs).ok_or(OptimizeError::Empty)?;
        debug!(best_node = %best_node, candidates = costs.len(), "Cost optimization completed");

        Ok(Optimization {
            best_node,
            costs,
            mode: DecisionMode::CostWeighted,
        })
    }

    fn latency_fallback(&self, latencies: &BTreeMap<String, f64>, node_ids: &[String]) -> Optimization {
        let costs: BTreeMap<String, f64> = node_ids
            .iter()
            .map(|id| {
                let latency = latencies
                    .get(id)
                    .copied()
                    .filter(|l| l.is_finite())
                    .unwrap_or(self.penalty_ms);
                (id.clone(), latency)
            })
            .collect();

        let best_node = arg_min(&costs).unwrap_or_else(|| NO_NODES_AVAILABLE.to_string());
        Optimization {
            best_node,
            costs,
            mode: DecisionMode::LatencyFallback,
        }
    }
}

/// Min-max normalize to `[0, 1]`; all-equal input maps to 0
pub fn normalize(values: &BTreeMap<String, f64>) -> BTreeMap<String, f64> {
    let min = values.values().copied().fold(f64::INFINITY, f64::min);
    let max = values.values().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    values
        .iter()
        .map(|(id, v)| {
            let scaled = if range > 0.0 { (v - min) / range } else { 0.0 };
            (id.clone(), scaled)
        })
        .collect()
}

/// First minimum in key order, so equal costs resolve to the smallest id
fn arg_min(costs: &BTreeMap<String, f64>) -> Option<String> {
    let mut best: Option<(&String, f64)> = None;
    for (id, cost) in costs {
        match best {
            Some((_, best_cost)) if cost.total_cmp(&best_cost).is_ge() => {}
            _ => best = Some((id, *cost)),
        }
    }
    best.map(|(id, _)| id.clone())
}
