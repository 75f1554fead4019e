//! Routing decision engine for the Vigil node router
//!
//! This crate provides the core functionality for:
//! - Feature engineering over multi-node telemetry history
//! - Model adapters for anomaly, failure and latency inference
//! - Cost-based routing optimization and explanations
//! - Health checks and observability

pub mod config;
pub mod error;
pub mod features;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod routing;

pub use config::EngineConfig;
pub use error::{ArtifactError, InferenceError, NodeInferenceError, OptimizeError, PipelineError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
pub use predictor::{DecisionEngine, ModelContext};
