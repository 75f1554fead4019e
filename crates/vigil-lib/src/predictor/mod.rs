//! ML prediction engine
//!
//! Three model adapters share the [`Predictor`] capability. Each wraps a
//! raw [`Model`] loaded once at startup and shared read-only by every
//! request through [`ModelContext`].

mod anomaly;
mod artifacts;
mod engine;
mod failure;
mod inference;
mod latency;
mod linear;
mod scaler;

pub use anomaly::{AnomalyDetector, AnomalyScore};
pub use artifacts::ArtifactStore;
pub use engine::{DecisionEngine, ModelContext};
pub use failure::FailureClassifier;
pub use inference::{FnModel, OnnxModel};
pub use latency::{exogenous_features, is_derived_from, LatencyForecaster};
pub use linear::{LinearModel, Link};
pub use scaler::StandardScaler;

use crate::error::InferenceError;
use crate::features::FeatureRow;
use anyhow::Result;

/// Raw numeric inference over one input vector
pub trait Model: Send + Sync {
    /// Run the model on a single row
    fn run(&self, input: &[f32]) -> Result<Vec<f32>>;

    /// Short description of the model backend
    fn kind(&self) -> &str;
}

/// Capability shared by the anomaly, failure and latency adapters
pub trait Predictor: Send + Sync {
    type Output;

    /// Run inference for one node's engineered feature row
    fn predict(&self, row: &FeatureRow) -> Result<Self::Output, InferenceError>;

    /// Adapter name used in logs
    fn name(&self) -> &'static str;
}

pub(crate) fn to_f32(values: &[f64]) -> Vec<f32> {
    values.iter().map(|v| *v as f32).collect()
}
