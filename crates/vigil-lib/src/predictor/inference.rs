//! ONNX inference using tract
//!
//! Provides lightweight ML inference for the routing models loaded via
//! tract-onnx, plus a closure-backed model for wiring custom backends.

use super::Model;
use anyhow::{Context, Result};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX model with a fixed `[1, input_width]` float input
pub struct OnnxModel {
    plan: TractModel,
    input_width: usize,
}

impl OnnxModel {
    /// Load and optimize an ONNX model from bytes
    pub fn from_bytes(model_bytes: &[u8], input_width: usize) -> Result<Self> {
        let plan = Self::load_model(model_bytes, input_width)?;
        Ok(Self { plan, input_width })
    }

    fn load_model(model_bytes: &[u8], input_width: usize) -> Result<TractModel> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, input_width]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    pub fn input_width(&self) -> usize {
        self.input_width
    }
}

impl Model for OnnxModel {
    fn run(&self, input: &[f32]) -> Result<Vec<f32>> {
        let start = Instant::now();

        if input.len() != self.input_width {
            anyhow::bail!(
                "Model expects {} inputs, got {}",
                self.input_width,
                input.len()
            );
        }

        let tensor: Tensor =
            tract_ndarray::Array2::from_shape_vec((1, self.input_width), input.to_vec())
                .context("Failed to build input tensor")?
                .into();
        let outputs = self.plan.run(tvec!(tensor.into()))?;

        // Classifiers exported with a label output emit probabilities last
        let values = outputs
            .iter()
            .rev()
            .find_map(|output| {
                output
                    .to_array_view::<f32>()
                    .ok()
                    .map(|view| view.iter().copied().collect::<Vec<f32>>())
            })
            .context("No float output from model")?;

        let elapsed = start.elapsed();

        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(values)
    }

    fn kind(&self) -> &str {
        "onnx"
    }
}

/// Model backed by a closure
pub struct FnModel<F> {
    f: F,
}

impl<F> FnModel<F>
where
    F: Fn(&[f32]) -> Result<Vec<f32>> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Model for FnModel<F>
where
    F: Fn(&[f32]) -> Result<Vec<f32>> + Send + Sync,
{
    fn run(&self, input: &[f32]) -> Result<Vec<f32>> {
        (self.f)(input)
    }

    fn kind(&self) -> &str {
        "custom"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_onnx_bytes_rejected() {
        let result = OnnxModel::from_bytes(b"definitely not a protobuf graph", 4);
        assert!(result.is_err());
    }

    #[test]
    fn test_fn_model() {
        let model = FnModel::new(|input: &[f32]| Ok(input.iter().map(|v| v * 2.0).collect()));
        assert_eq!(model.run(&[1.0, 2.5]).unwrap(), vec![2.0, 5.0]);
        assert_eq!(model.kind(), "custom");
    }
}
