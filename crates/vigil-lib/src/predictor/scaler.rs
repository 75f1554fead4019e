//! Standardization applied before the anomaly and failure models

use crate::error::InferenceError;
use serde::{Deserialize, Serialize};

/// Per-feature `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Returns `None` when `mean` and `scale` differ in length
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Option<Self> {
        (mean.len() == scale.len()).then_some(Self { mean, scale })
    }

    /// Scaler that leaves values unchanged
    pub fn identity(width: usize) -> Self {
        Self {
            mean: vec![0.0; width],
            scale: vec![1.0; width],
        }
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }

    pub(crate) fn is_consistent(&self) -> bool {
        self.mean.len() == self.scale.len()
    }

    pub fn transform(&self, values: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if values.len() != self.width() {
            return Err(InferenceError::ShapeMismatch {
                expected: self.width(),
                actual: values.len(),
            });
        }
        Ok(values
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| {
                // Constant features were fitted with zero variance
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (x - mean) / scale
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform() {
        let scaler = StandardScaler::new(vec![10.0, 0.0], vec![2.0, 0.0]).unwrap();
        assert_eq!(scaler.transform(&[14.0, 3.0]).unwrap(), vec![2.0, 3.0]);
    }

    #[test]
    fn test_width_mismatch() {
        let scaler = StandardScaler::identity(2);
        assert!(matches!(
            scaler.transform(&[1.0]),
            Err(InferenceError::ShapeMismatch { expected: 2, actual: 1 })
        ));
        assert!(StandardScaler::new(vec![0.0], vec![]).is_none());
    }

    #[test]
    fn test_deserialize_checks_consistency() {
        let scaler: StandardScaler = serde_json::from_str(r#"{"mean": [1.0], "scale": []}"#).unwrap();
        assert!(!scaler.is_consistent());
    }
}
