//! Linear and logistic models stored as JSON artifacts

use super::Model;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Output transformation applied after the affine step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Link {
    #[default]
    Identity,
    Logistic,
}

/// `y = link(W x + b)` with one weight row per output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    weights: Vec<Vec<f64>>,
    intercept: Vec<f64>,
    #[serde(default)]
    link: Link,
}

impl LinearModel {
    pub fn new(weights: Vec<Vec<f64>>, intercept: Vec<f64>, link: Link) -> Result<Self> {
        let model = Self {
            weights,
            intercept,
            link,
        };
        model.validate()?;
        Ok(model)
    }

    /// Single-output model
    pub fn single(weights: Vec<f64>, intercept: f64, link: Link) -> Result<Self> {
        Self::new(vec![weights], vec![intercept], link)
    }

    /// Parse and validate a JSON artifact
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let model: Self = serde_json::from_slice(bytes).context("Failed to parse linear model")?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        if self.weights.is_empty() {
            anyhow::bail!("Linear model has no outputs");
        }
        if self.weights.len() != self.intercept.len() {
            anyhow::bail!(
                "Linear model has {} weight rows but {} intercepts",
                self.weights.len(),
                self.intercept.len()
            );
        }
        let width = self.weights[0].len();
        if self.weights.iter().any(|row| row.len() != width) {
            anyhow::bail!("Linear model weight rows differ in width");
        }
        Ok(())
    }

    pub fn input_width(&self) -> usize {
        self.weights.first().map(|row| row.len()).unwrap_or(0)
    }

    pub fn outputs(&self) -> usize {
        self.weights.len()
    }
}

impl Model for LinearModel {
    fn run(&self, input: &[f32]) -> Result<Vec<f32>> {
        if input.len() != self.input_width() {
            anyhow::bail!(
                "Model expects {} inputs, got {}",
                self.input_width(),
                input.len()
            );
        }
        Ok(self
            .weights
            .iter()
            .zip(&self.intercept)
            .map(|(row, b)| {
                let z = row
                    .iter()
                    .zip(input)
                    .map(|(w, x)| w * *x as f64)
                    .sum::<f64>()
                    + b;
                let y = match self.link {
                    Link::Identity => z,
                    Link::Logistic => 1.0 / (1.0 + (-z).exp()),
                };
                y as f32
            })
            .collect())
    }

    fn kind(&self) -> &str {
        "linear"
    }
}
