//! Service configuration
//!
//! Sources, lowest precedence first: built-in defaults, an optional config
//! file (`vigil.toml`, `vigil.yaml` or `vigil.json`, or the path in
//! `VIGIL_CONFIG`), then `VIGIL_*` environment variables with `__` between
//! nested keys, e.g. `VIGIL_ENGINE__OPTIMIZER__WEIGHT_FAILURE=0.6`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;
use vigil_lib::EngineConfig;

const DEFAULT_CONFIG_FILE: &str = "vigil";
const CONFIG_PATH_ENV: &str = "VIGIL_CONFIG";
const ENV_PREFIX: &str = "VIGIL";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP listen port
    pub port: u16,
    /// Deadline for one `/predict` request
    pub request_timeout_ms: u64,
    pub engine: EngineConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: 8001,
            request_timeout_ms: 2000,
            engine: EngineConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the config file and environment
    pub fn load() -> Result<Self> {
        let file = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::from_sources(&file, environment())
    }

    fn from_sources(file: &str, env: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(env)
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// `VIGIL_` prefix, `__` between nested keys
fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_source(vars: &[(&str, &str)]) -> config::Environment {
        let map = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(map))
    }

    #[test]
    fn test_env_overrides_top_level_and_nested_keys() {
        let env = env_source(&[
            ("VIGIL_PORT", "9100"),
            ("VIGIL_ENGINE__OPTIMIZER__WEIGHT_FAILURE", "0.6"),
            ("VIGIL_ENGINE__LATENCY__PENALTY_MS", "5000"),
        ]);
        let config = ServiceConfig::from_sources("does-not-exist", env).unwrap();

        assert_eq!(config.port, 9100);
        assert_eq!(config.engine.optimizer.weight_failure, 0.6);
        assert_eq!(config.engine.latency.penalty_ms, 5000.0);
        assert_eq!(config.engine.optimizer.weight_latency, 0.3);
    }

    #[test]
    fn test_env_ignores_other_prefixes() {
        let env = env_source(&[("OTHER_PORT", "9100"), ("VIGILANT_PORT", "9200")]);
        let config = ServiceConfig::from_sources("does-not-exist", env).unwrap();
        assert_eq!(config.port, 8001);
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.port, 8001);
        assert_eq!(config.request_timeout(), Duration::from_secs(2));
        assert_eq!(config.engine.history_size(), 15);
    }

    #[test]
    fn test_file_overrides_nested_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vigil.toml");
        std::fs::write(
            &path,
            "port = 9000\n\n[engine.optimizer]\nweight_failure = 0.5\nweight_latency = 0.5\n",
        )
        .unwrap();

        let config: ServiceConfig = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.request_timeout_ms, 2000);
        assert_eq!(config.engine.optimizer.weight_failure, 0.5);
        assert_eq!(config.engine.latency.penalty_ms, 9999.0);
    }
}
