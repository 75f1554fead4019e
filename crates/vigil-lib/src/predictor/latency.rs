//! Per-node latency forecasting

use super::{to_f32, Model, Predictor};
use crate::config::LatencyBounds;
use crate::error::InferenceError;
use crate::features::{threshold_column, FeatureRow};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, warn};

/// True when `column` is the target itself or was derived from it
///
/// Covers windowed and lagged columns (`<target>_...`), the threshold flag
/// (`is_high_<target>...`) and interactions with the target on either side.
pub fn is_derived_from(column: &str, target: &str) -> bool {
    column == target
        || column.starts_with(&format!("{}_", target))
        || column.starts_with(&threshold_column(target))
        || column.contains(&format!("_x_{}", target))
}

/// Exogenous inputs of a forecaster: the feature list minus every column
/// derived from `target`, preserving input order
pub fn exogenous_features(features: &[String], target: &str) -> Vec<String> {
    features
        .iter()
        .filter(|f| !is_derived_from(f, target))
        .cloned()
        .collect()
}

/// One forecasting model per known node id
///
/// A node without a model, or whose model fails, gets the penalty latency
/// so it can still be ranked. Only a row missing exogenous features is an
/// error.
pub struct LatencyForecaster {
    models: HashMap<String, Box<dyn Model>>,
    features: Arc<[String]>,
    bounds: LatencyBounds,
}

impl LatencyForecaster {
    pub fn new(
        models: HashMap<String, Box<dyn Model>>,
        features: Arc<[String]>,
        bounds: LatencyBounds,
    ) -> Self {
        Self {
            models,
            features,
            bounds,
        }
    }

    /// Node ids with a loaded model, sorted
    pub fn nodes(&self) -> Vec<&str> {
        let mut nodes: Vec<&str> = self.models.keys().map(String::as_str).collect();
        nodes.sort_unstable();
        nodes
    }

    pub fn has_model(&self, node_id: &str) -> bool {
        self.models.contains_key(node_id)
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Exogenous feature names fed to every forecaster
    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn bounds(&self) -> LatencyBounds {
        self.bounds
    }

    fn clamp(&self, node_id: &str, prediction: f64) -> f64 {
        if prediction < self.bounds.min_ms {
            warn!(
                node_id = %node_id,
                prediction = prediction,
                "Latency forecast below minimum, clamping"
            );
            self.bounds.min_ms
        } else if prediction > self.bounds.max_ms {
            warn!(
                node_id = %node_id,
                prediction = prediction,
                "Latency forecast above maximum, clamping"
            );
            self.bounds.max_ms
        } else {
            prediction
        }
    }
}

impl Predictor for LatencyForecaster {
    type Output = f64;

    fn predict(&self, row: &FeatureRow) -> Result<f64, InferenceError> {
        let exog = row.vector(&self.features)?;

        let Some(model) = self.models.get(&row.node_id) else {
            warn!(
                node_id = %row.node_id,
                penalty_ms = self.bounds.penalty_ms,
                "No latency model for node, using penalty latency"
            );
            return Ok(self.bounds.penalty_ms);
        };

        match model.run(&to_f32(&exog)) {
            Ok(output) => match output.first().map(|v| f64::from(*v)) {
                Some(prediction) if prediction.is_finite() => Ok(self.clamp(&row.node_id, prediction)),
                _ => {
                    error!(
                        node_id = %row.node_id,
                        "Latency model returned no usable value, using penalty latency"
                    );
                    Ok(self.bounds.penalty_ms)
                }
            },
            Err(e) => {
                error!(
                    node_id = %row.node_id,
                    error = %e,
                    "Latency model failed, using penalty latency"
                );
                Ok(self.bounds.penalty_ms)
            }
        }
    }

    fn name(&self) -> &'static str {
        "latency"
    }
}
