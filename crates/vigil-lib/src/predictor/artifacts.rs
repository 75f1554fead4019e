//! Loading of persisted model artifacts
//!
//! Everything here runs once at startup. The resulting [`ModelContext`] is
//! immutable and shared by every decision request.

use super::{
    exogenous_features, AnomalyDetector, FailureClassifier, LatencyForecaster, LinearModel,
    Model, ModelContext, OnnxModel, StandardScaler,
};
use crate::config::{ArtifactConfig, LatencyBounds};
use crate::error::ArtifactError;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const FEATURE_LIST_FILE: &str = "feature_list.json";
const ANOMALY_THRESHOLD_FILE: &str = "anomaly_threshold.json";
const CHECKSUM_EXTENSION: &str = "sha256";

/// Threshold files hold either a bare number or `{"threshold": n}`
#[derive(Deserialize)]
#[serde(untagged)]
enum ThresholdFile {
    Bare(f64),
    Wrapped { threshold: f64 },
}

impl ThresholdFile {
    fn value(&self) -> f64 {
        match self {
            ThresholdFile::Bare(v) => *v,
            ThresholdFile::Wrapped { threshold } => *threshold,
        }
    }
}

/// Reads model artifacts from the configured directories
pub struct ArtifactStore {
    config: ArtifactConfig,
    bounds: LatencyBounds,
}

impl ArtifactStore {
    pub fn new(config: ArtifactConfig, bounds: LatencyBounds) -> Self {
        Self { config, bounds }
    }

    /// Load every model and build the shared context
    ///
    /// Missing anomaly or failure artifacts, feature list or threshold are
    /// fatal. A latency model that fails to load is skipped.
    pub fn load(&self) -> Result<ModelContext, ArtifactError> {
        let feature_list: Arc<[String]> = self.load_feature_list()?.into();
        let threshold = self.load_threshold()?;

        let anomaly = AnomalyDetector::new(
            self.load_model(&self.config.anomaly_model_base_name, feature_list.len())?,
            self.load_scaler(&self.config.anomaly_model_base_name)?,
            threshold,
            feature_list.clone(),
        )?;

        let failure = FailureClassifier::new(
            self.load_model(&self.config.failure_model_base_name, feature_list.len())?,
            self.load_scaler(&self.config.failure_model_base_name)?,
            feature_list.clone(),
        )?;

        let exog: Arc<[String]> =
            exogenous_features(&feature_list, &self.config.latency_target_column).into();
        let latency = LatencyForecaster::new(
            self.load_latency_models(exog.len())?,
            exog,
            self.bounds,
        );

        info!(
            event = "artifacts_loaded",
            features = feature_list.len(),
            anomaly_threshold = threshold,
            anomaly_model = %anomaly.model_kind(),
            failure_model = %failure.model_kind(),
            latency_models = latency.model_count(),
            "Model artifacts loaded"
        );

        Ok(ModelContext::new(feature_list, anomaly, failure, latency))
    }

    fn load_feature_list(&self) -> Result<Vec<String>, ArtifactError> {
        let path = self.config.artifacts_dir.join(FEATURE_LIST_FILE);
        let features: Vec<String> = parse_json(&path, &self.read(&path)?)?;
        if features.is_empty() {
            return Err(ArtifactError::Invalid(format!(
                "{} lists no features",
                path.display()
            )));
        }
        Ok(features)
    }

    fn load_threshold(&self) -> Result<f64, ArtifactError> {
        let path = self.config.artifacts_dir.join(ANOMALY_THRESHOLD_FILE);
        let file: ThresholdFile = parse_json(&path, &self.read(&path)?)?;
        Ok(file.value())
    }

    fn load_scaler(&self, base_name: &str) -> Result<StandardScaler, ArtifactError> {
        let path = self.config.models_dir.join(format!("{}_scaler.json", base_name));
        let scaler: StandardScaler = parse_json(&path, &self.read(&path)?)?;
        if !scaler.is_consistent() {
            return Err(ArtifactError::Invalid(format!(
                "{} has mismatched mean and scale lengths",
                path.display()
            )));
        }
        Ok(scaler)
    }

    /// `<base>_model.onnx`, falling back to `<base>_model.json`
    fn load_model(&self, base_name: &str, input_width: usize) -> Result<Box<dyn Model>, ArtifactError> {
        let onnx = self.config.models_dir.join(format!("{}_model.onnx", base_name));
        let json = onnx.with_extension("json");
        if onnx.exists() {
            self.load_model_file(&onnx, input_width)
        } else if json.exists() {
            self.load_model_file(&json, input_width)
        } else {
            Err(ArtifactError::Missing(onnx))
        }
    }

    fn load_model_file(&self, path: &Path, input_width: usize) -> Result<Box<dyn Model>, ArtifactError> {
        let bytes = self.read(path)?;
        let model_err = |e: anyhow::Error| ArtifactError::Model {
            path: path.to_path_buf(),
            message: format!("{:#}", e),
        };

        let model: Box<dyn Model> = match path.extension().and_then(|e| e.to_str()) {
            Some("onnx") => Box::new(OnnxModel::from_bytes(&bytes, input_width).map_err(model_err)?),
            _ => {
                let linear = LinearModel::from_json(&bytes).map_err(model_err)?;
                if linear.input_width() != input_width {
                    return Err(ArtifactError::Model {
                        path: path.to_path_buf(),
                        message: format!(
                            "expects {} inputs, feature list provides {}",
                            linear.input_width(),
                            input_width
                        ),
                    });
                }
                Box::new(linear)
            }
        };

        debug!(path = %path.display(), kind = %model.kind(), "Loaded model");
        Ok(model)
    }

    /// Discover `latency_model_<node_id>.{onnx,json}` files
    fn load_latency_models(&self, input_width: usize) -> Result<HashMap<String, Box<dyn Model>>, ArtifactError> {
        let dir = &self.config.models_dir;
        let entries = fs::read_dir(dir).map_err(|source| ArtifactError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut candidates: BTreeMap<String, PathBuf> = BTreeMap::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(node_id) = self.latency_node_id(&path) else {
                continue;
            };
            // Prefer the ONNX export when both formats exist
            let is_onnx = path.extension().is_some_and(|e| e == "onnx");
            if is_onnx || !candidates.contains_key(&node_id) {
                candidates.insert(node_id, path);
            }
        }

        let mut models = HashMap::new();
        for (node_id, path) in candidates {
            match self.load_model_file(&path, input_width) {
                Ok(model) => {
                    models.insert(node_id, model);
                }
                Err(e) => {
                    warn!(
                        node_id = %node_id,
                        path = %path.display(),
                        error = %e,
                        "Failed to load latency model, skipping node"
                    );
                }
            }
        }

        if models.is_empty() {
            warn!(dir = %dir.display(), "No latency models loaded, every node will get the penalty latency");
        }
        Ok(models)
    }

    fn latency_node_id(&self, path: &Path) -> Option<String> {
        let extension = path.extension()?.to_str()?;
        if extension != "onnx" && extension != "json" {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        let node_id = stem.strip_prefix(&self.config.latency_model_prefix)?;
        (!node_id.is_empty()).then(|| node_id.to_string())
    }

    /// Read a file, verifying its `.sha256` sidecar when present
    fn read(&self, path: &Path) -> Result<Vec<u8>, ArtifactError> {
        if !path.exists() {
            return Err(ArtifactError::Missing(path.to_path_buf()));
        }
        let bytes = fs::read(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut sidecar = path.as_os_str().to_owned();
        sidecar.push(".");
        sidecar.push(CHECKSUM_EXTENSION);
        let sidecar = PathBuf::from(sidecar);

        if sidecar.exists() {
            let recorded = fs::read_to_string(&sidecar).map_err(|source| ArtifactError::Io {
                path: sidecar.clone(),
                source,
            })?;
            // sha256sum format: "<hex>  <file name>"
            let expected = recorded
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_lowercase();
            let actual = compute_checksum(&bytes);
            if expected != actual {
                return Err(ArtifactError::Checksum {
                    path: path.to_path_buf(),
                    expected,
                    actual,
                });
            }
            debug!(path = %path.display(), checksum = %actual, "Artifact checksum validated");
        }

        Ok(bytes)
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T, ArtifactError> {
    serde_json::from_slice(bytes).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Hex-encoded SHA-256 of `data`
pub(crate) fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
