//! Vigil ML service: HTTP front end of the routing decision engine

pub mod api;
pub mod config;

use crate::api::AppState;
use crate::config::ServiceConfig;
use std::sync::Arc;
use tracing::error;
use vigil_lib::{
    health::{components, HealthRegistry},
    predictor::ArtifactStore,
    DecisionEngine, EngineMetrics,
};

/// Load model artifacts and assemble the shared application state
///
/// An artifact failure does not abort startup: the service stays up,
/// reports the artifacts component unhealthy and answers `/predict` with
/// 503.
pub async fn initialize(config: &ServiceConfig) -> AppState {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::ENGINE).await;

    let metrics = EngineMetrics::new();
    let store = ArtifactStore::new(config.engine.artifacts.clone(), config.engine.latency);

    let engine = match store.load() {
        Ok(context) => {
            health_registry.set_healthy(components::ARTIFACTS).await;

            let latency_models = context.latency().model_count();
            metrics.set_latency_models_loaded(latency_models as i64);
            if latency_models == 0 {
                health_registry
                    .set_degraded(
                        components::LATENCY_MODELS,
                        "No latency models loaded, every node gets the penalty latency",
                    )
                    .await;
            } else {
                health_registry.set_healthy(components::LATENCY_MODELS).await;
            }

            health_registry.set_ready(true).await;
            Some(Arc::new(DecisionEngine::new(Arc::new(context), &config.engine)))
        }
        Err(e) => {
            error!(error = %e, "Failed to load model artifacts");
            health_registry
                .set_unhealthy(components::ARTIFACTS, e.to_string())
                .await;
            None
        }
    };

    AppState::new(health_registry, metrics, engine, config.request_timeout())
}
