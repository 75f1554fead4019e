//! Failure probability classification

use super::{to_f32, Model, Predictor, StandardScaler};
use crate::error::{ArtifactError, InferenceError};
use crate::features::FeatureRow;
use std::sync::Arc;

/// Binary classifier over the scaled feature vector
///
/// Models emitting a single value are read as the positive-class
/// probability. Models emitting per-class probabilities are read at
/// index 1.
pub struct FailureClassifier {
    model: Box<dyn Model>,
    scaler: StandardScaler,
    features: Arc<[String]>,
}

impl FailureClassifier {
    pub fn new(
        model: Box<dyn Model>,
        scaler: StandardScaler,
        features: Arc<[String]>,
    ) -> Result<Self, ArtifactError> {
        if scaler.width() != features.len() {
            return Err(ArtifactError::Invalid(format!(
                "failure scaler width {} does not match {} features",
                scaler.width(),
                features.len()
            )));
        }
        Ok(Self {
            model,
            scaler,
            features,
        })
    }

    pub fn model_kind(&self) -> &str {
        self.model.kind()
    }
}

impl Predictor for FailureClassifier {
    type Output = f64;

    fn predict(&self, row: &FeatureRow) -> Result<f64, InferenceError> {
        let scaled = self.scaler.transform(&row.vector(&self.features)?)?;
        let output = self.model.run(&to_f32(&scaled))?;

        let probability = match output.as_slice() {
            [p] => f64::from(*p),
            [_, p, ..] => f64::from(*p),
            [] => {
                return Err(InferenceError::ShapeMismatch {
                    expected: 1,
                    actual: 0,
                })
            }
        };

        if !probability.is_finite() {
            return Err(InferenceError::Model(format!(
                "non-finite failure probability for node '{}'",
                row.node_id
            )));
        }

        Ok(probability.clamp(0.0, 1.0))
    }

    fn name(&self) -> &'static str {
        "failure"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::{FnModel, LinearModel, Link};
    use chrono::Utc;

    fn features() -> Arc<[String]> {
        vec!["is_high_cpu_usage".to_string()].into()
    }

    fn row(flag: f64) -> FeatureRow {
        FeatureRow::new("n1", "geth", Utc::now()).with("is_high_cpu_usage", flag)
    }

    #[test]
    fn test_logistic_probability() {
        let model = LinearModel::single(vec![4.0], -2.0, Link::Logistic).unwrap();
        let classifier =
            FailureClassifier::new(Box::new(model), StandardScaler::identity(1), features())
                .unwrap();

        let low = classifier.predict(&row(0.0)).unwrap();
        let high = classifier.predict(&row(1.0)).unwrap();
        assert!(low < 0.2);
        assert!(high > 0.8);
    }

    #[test]
    fn test_class_probabilities_read_at_index_one() {
        let model = FnModel::new(|_: &[f32]| Ok(vec![0.25, 0.75]));
        let classifier =
            FailureClassifier::new(Box::new(model), StandardScaler::identity(1), features())
                .unwrap();
        assert_eq!(classifier.predict(&row(1.0)).unwrap(), 0.75);
    }

    #[test]
    fn test_probability_clamped() {
        let model = FnModel::new(|_: &[f32]| Ok(vec![1.4]));
        let classifier =
            FailureClassifier::new(Box::new(model), StandardScaler::identity(1), features())
                .unwrap();
        assert_eq!(classifier.predict(&row(1.0)).unwrap(), 1.0);
    }

    #[test]
    fn test_nan_probability_is_an_error() {
        let model = FnModel::new(|_: &[f32]| Ok(vec![f32::NAN]));
        let classifier =
            FailureClassifier::new(Box::new(model), StandardScaler::identity(1), features())
                .unwrap();
        assert!(matches!(
            classifier.predict(&row(1.0)),
            Err(InferenceError::Model(_))
        ));
    }

    #[test]
    fn test_empty_output() {
        let model = FnModel::new(|_: &[f32]| Ok(Vec::new()));
        let classifier =
            FailureClassifier::new(Box::new(model), StandardScaler::identity(1), features())
                .unwrap();
        assert!(classifier.predict(&row(1.0)).is_err());
    }
}
