//! Reconstruction-error anomaly detection

use super::{to_f32, Model, Predictor, StandardScaler};
use crate::error::{ArtifactError, InferenceError};
use crate::features::FeatureRow;
use std::sync::Arc;

/// Reconstruction error of one row against the calibrated threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyScore {
    pub reconstruction_error: f64,
    pub threshold: f64,
}

impl AnomalyScore {
    /// Strictly above the threshold
    pub fn is_anomaly(&self) -> bool {
        self.reconstruction_error > self.threshold
    }
}

/// Autoencoder-style detector: scales the feature vector, reconstructs it
/// and reports the mean squared reconstruction error
pub struct AnomalyDetector {
    model: Box<dyn Model>,
    scaler: StandardScaler,
    threshold: f64,
    features: Arc<[String]>,
}

impl AnomalyDetector {
    pub fn new(
        model: Box<dyn Model>,
        scaler: StandardScaler,
        threshold: f64,
        features: Arc<[String]>,
    ) -> Result<Self, ArtifactError> {
        if features.is_empty() {
            return Err(ArtifactError::Invalid("anomaly feature list is empty".into()));
        }
        if scaler.width() != features.len() {
            return Err(ArtifactError::Invalid(format!(
                "anomaly scaler width {} does not match {} features",
                scaler.width(),
                features.len()
            )));
        }
        if !threshold.is_finite() {
            return Err(ArtifactError::Invalid(format!(
                "anomaly threshold {} is not finite",
                threshold
            )));
        }
        Ok(Self {
            model,
            scaler,
            threshold,
            features,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn model_kind(&self) -> &str {
        self.model.kind()
    }
}

impl Predictor for AnomalyDetector {
    type Output = AnomalyScore;

    fn predict(&self, row: &FeatureRow) -> Result<AnomalyScore, InferenceError> {
        let scaled = self.scaler.transform(&row.vector(&self.features)?)?;
        let reconstructed = self.model.run(&to_f32(&scaled))?;

        if reconstructed.len() != scaled.len() {
            return Err(InferenceError::ShapeMismatch {
                expected: scaled.len(),
                actual: reconstructed.len(),
            });
        }

        let reconstruction_error = scaled
            .iter()
            .zip(&reconstructed)
            .map(|(x, r)| (x - *r as f64).powi(2))
            .sum::<f64>()
            / scaled.len() as f64;

        if !reconstruction_error.is_finite() {
            return Err(InferenceError::Model(format!(
                "non-finite reconstruction error for node '{}'",
                row.node_id
            )));
        }

        Ok(AnomalyScore {
            reconstruction_error,
            threshold: self.threshold,
        })
    }

    fn name(&self) -> &'static str {
        "anomaly"
    }
}
