//! Error taxonomy for the routing engine
//!
//! Only schema problems and artifact loading failures ever reach a caller.
//! Inference and optimization errors are contained by the engine: a failing
//! node is dropped, a failing optimizer falls back to latency-only ranking.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the feature pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required column is absent from the raw history
    #[error("missing required column '{column}' (first seen missing at row {row})")]
    MissingColumn { column: &'static str, row: usize },

    /// Internal failure while deriving features
    #[error("feature derivation failed: {0}")]
    Derivation(String),
}

/// Errors raised while running inference for a single node
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("feature '{0}' missing from engineered row")]
    MissingFeature(String),

    #[error("expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("model inference failed: {0}")]
    Model(String),
}

impl From<anyhow::Error> for InferenceError {
    fn from(err: anyhow::Error) -> Self {
        InferenceError::Model(format!("{:#}", err))
    }
}

/// Inference failure attributed to the adapter that raised it
#[derive(Debug, Error)]
#[error("{adapter} adapter: {source}")]
pub struct NodeInferenceError {
    pub adapter: &'static str,
    #[source]
    pub source: InferenceError,
}

/// Errors raised inside the cost optimizer
#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("no candidate nodes")]
    Empty,

    #[error("no {kind} entry for node '{node_id}'")]
    MissingEntry { kind: &'static str, node_id: String },

    #[error("non-finite cost for node '{0}'")]
    NonFinite(String),
}

/// Errors raised while loading model artifacts at startup
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {0}")]
    Missing(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    Checksum {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("failed to load model {path}: {message}")]
    Model { path: PathBuf, message: String },

    #[error("invalid artifact: {0}")]
    Invalid(String),
}
