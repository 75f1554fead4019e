//! Engine configuration
//!
//! Every section deserializes with defaults so a partial file or a handful
//! of environment overrides is enough to run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Recommended minimum number of samples per node for rolling-window validity
pub const DEFAULT_HISTORY_SIZE: usize = 15;

/// Feature engineering parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Base metrics that receive trend, rolling and lag columns
    pub metrics_to_engineer: Vec<String>,
    /// Pairs multiplied into `a_x_b` interaction columns
    pub interaction_pairs: Vec<(String, String)>,
    /// Metrics turned into `is_high_<metric>` indicators
    pub thresholds: BTreeMap<String, f64>,
    pub rolling_windows: Vec<usize>,
    pub lag_periods: Vec<usize>,
    /// Fill values for absent or null metrics
    pub feature_defaults: BTreeMap<String, f64>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        let metrics = [
            "cpu_usage",
            "memory_usage",
            "disk_io",
            "latency_ms",
            "block_height_gap",
            "error_rate",
        ];
        Self {
            metrics_to_engineer: metrics.iter().map(|m| m.to_string()).collect(),
            interaction_pairs: vec![
                ("cpu_usage".into(), "error_rate".into()),
                ("memory_usage".into(), "disk_io".into()),
                ("latency_ms".into(), "block_height_gap".into()),
            ],
            thresholds: BTreeMap::from([
                ("cpu_usage".to_string(), 80.0),
                ("memory_usage".to_string(), 85.0),
                ("disk_io".to_string(), 50.0),
                ("error_rate".to_string(), 10.0),
                ("block_height_gap".to_string(), 5.0),
            ]),
            rolling_windows: vec![5, 10],
            lag_periods: vec![1, 3],
            feature_defaults: metrics.iter().map(|m| (m.to_string(), 0.0)).collect(),
        }
    }
}

/// Cost weights for the routing optimizer
///
/// The weights are a tunable policy. They are expected to sum to 1.0 but
/// nothing enforces it, so the cost is not guaranteed to be a convex
/// combination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub weight_failure: f64,
    pub weight_latency: f64,
    /// Sentence appended to every explanation describing what the router
    /// does with the recommendation downstream
    pub downstream_policy: Option<String>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            weight_failure: 0.7,
            weight_latency: 0.3,
            downstream_policy: Some(
                "Router applies auto-calibration (learns environment offset) and hybrid \
                 scoring (70% prediction + 30% recent actual) for the final routing decision."
                    .to_string(),
            ),
        }
    }
}

/// Plausible range for latency forecasts
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyBounds {
    pub min_ms: f64,
    pub max_ms: f64,
    /// Returned when a node has no forecaster or its forecast fails
    pub penalty_ms: f64,
}

impl Default for LatencyBounds {
    fn default() -> Self {
        Self {
            min_ms: 0.0,
            max_ms: 10_000.0,
            penalty_ms: 9_999.0,
        }
    }
}

/// Locations and naming conventions of the persisted model artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub models_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub anomaly_model_base_name: String,
    pub failure_model_base_name: String,
    /// File-name prefix of per-node latency forecasters; the rest of the
    /// file stem is the node id
    pub latency_model_prefix: String,
    /// Column the latency forecasters predict
    pub latency_target_column: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            artifacts_dir: PathBuf::from("artifacts"),
            anomaly_model_base_name: "anomaly".to_string(),
            failure_model_base_name: "failure".to_string(),
            latency_model_prefix: "latency_model_".to_string(),
            latency_target_column: "latency_ms".to_string(),
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub features: FeatureConfig,
    pub optimizer: OptimizerConfig,
    pub latency: LatencyBounds,
    pub artifacts: ArtifactConfig,
    pub prediction_history_size: Option<usize>,
}

impl EngineConfig {
    pub fn history_size(&self) -> usize {
        self.prediction_history_size.unwrap_or(DEFAULT_HISTORY_SIZE)
    }
}
