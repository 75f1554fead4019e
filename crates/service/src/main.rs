//! vigil-ml - routing prediction service
//!
//! Loads the model artifacts once, then serves routing recommendations
//! over HTTP until interrupted.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vigil_lib::StructuredLogger;
use vigil_service::{api, config::ServiceConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs, filtered by RUST_LOG
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = ServiceConfig::load()?;
    info!(
        port = config.port,
        models_dir = %config.engine.artifacts.models_dir.display(),
        artifacts_dir = %config.engine.artifacts.artifacts_dir.display(),
        "Service configured"
    );

    let state = Arc::new(vigil_service::initialize(&config).await);
    let latency_models = state
        .engine
        .as_ref()
        .map(|engine| engine.context().latency().model_count())
        .unwrap_or(0);

    let logger = StructuredLogger::new("vigil-ml");
    logger.log_startup(api::SERVICE_VERSION, latency_models);

    api::serve(config.port, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
    })
    .await?;

    logger.log_shutdown("SIGINT received");
    Ok(())
}
