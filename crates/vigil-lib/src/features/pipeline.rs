//! Feature engineering pipeline
//!
//! Steps, in order: schema validation, grouping and sorting by
//! `(node_id, timestamp)`, default filling, interaction products, threshold
//! indicators, then per-node trend, rolling and lag columns. Values that are
//! undefined at series start are filled with zero at the end.

use super::table::{FeatureTable, NodeSeries};
use super::window::{diff, rolling_mean, rolling_std, shift};
use crate::config::FeatureConfig;
use crate::error::PipelineError;
use crate::models::{NodeMetric, BASE_METRICS};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, error, info, warn};

/// Identity and metadata columns; never numeric, never filled
pub const METADATA_COLUMNS: [&str; 3] = ["timestamp", "node_id", "client_type"];

/// Name of the interaction column for a pair
pub fn interaction_column(a: &str, b: &str) -> String {
    format!("{}_x_{}", a, b)
}

/// Name of the threshold indicator column for a metric
pub fn threshold_column(metric: &str) -> String {
    format!("is_high_{}", metric)
}

/// Nodes whose engineered history is shorter than `min_points`
pub fn insufficient_history(table: &FeatureTable, min_points: usize) -> Vec<String> {
    table
        .nodes
        .iter()
        .filter(|(_, series)| series.len() < min_points)
        .map(|(id, _)| id.clone())
        .collect()
}

/// Client type from the node id prefix, e.g. `agave_self_hosted` -> `agave`
fn infer_client_type(node_id: &str) -> String {
    match node_id.split_once('_') {
        Some((prefix, _)) => prefix.to_string(),
        None => "unknown".to_string(),
    }
}

/// One node's history while features are being derived
#[derive(Debug, Default)]
struct WorkingSeries {
    timestamps: Vec<DateTime<Utc>>,
    client_types: Vec<String>,
    values: HashMap<String, Vec<Option<f64>>>,
}

impl WorkingSeries {
    fn column(&self, name: &str) -> &[Option<f64>] {
        self.values.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

#[derive(Debug, Default)]
struct Frame {
    columns: Vec<String>,
    nodes: BTreeMap<String, WorkingSeries>,
}

impl Frame {
    fn from_samples(samples: &[NodeMetric]) -> Result<Self, PipelineError> {
        let mut grouped: BTreeMap<String, Vec<(DateTime<Utc>, &NodeMetric)>> = BTreeMap::new();
        for (row, sample) in samples.iter().enumerate() {
            let timestamp = sample.timestamp.ok_or(PipelineError::MissingColumn {
                column: "timestamp",
                row,
            })?;
            let node_id = sample.node_key().ok_or(PipelineError::MissingColumn {
                column: "node_id",
                row,
            })?;
            grouped
                .entry(node_id.to_string())
                .or_default()
                .push((timestamp, sample));
        }

        let mut columns: Vec<String> = Vec::new();
        for name in BASE_METRICS {
            if samples.iter().any(|s| s.metric(name).is_some()) {
                columns.push(name.to_string());
            }
        }
        for sample in samples {
            for name in sample.extra_metric_names() {
                if !columns.iter().any(|c| c == name) {
                    columns.push(name.to_string());
                }
            }
        }

        let derive_error_rate = !columns.iter().any(|c| c == "error_rate");
        if derive_error_rate && !samples.is_empty() {
            info!("No error_rate reported, deriving it from is_healthy");
            columns.push("error_rate".to_string());
        }

        let mut nodes = BTreeMap::new();
        for (node_id, mut rows) in grouped {
            rows.sort_by_key(|(ts, _)| *ts);
            let mut series = WorkingSeries {
                timestamps: rows.iter().map(|(ts, _)| *ts).collect(),
                client_types: rows
                    .iter()
                    .map(|(_, s)| {
                        s.client_type
                            .clone()
                            .unwrap_or_else(|| infer_client_type(&node_id))
                    })
                    .collect(),
                values: HashMap::new(),
            };
            for name in &columns {
                let column = if name == "error_rate" && derive_error_rate {
                    rows.iter()
                        .map(|(_, s)| Some((1.0 - s.is_healthy.unwrap_or(1.0)) * 100.0))
                        .collect()
                } else {
                    rows.iter().map(|(_, s)| s.metric(name)).collect()
                };
                series.values.insert(name.clone(), column);
            }
            nodes.insert(node_id, series);
        }

        Ok(Self { columns, nodes })
    }

    fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Compute a column independently for every node and add or replace it
    fn derive<F>(&mut self, name: String, f: F)
    where
        F: Fn(&WorkingSeries) -> Vec<Option<f64>>,
    {
        for series in self.nodes.values_mut() {
            let column = f(series);
            series.values.insert(name.clone(), column);
        }
        if !self.has_column(&name) {
            self.columns.push(name);
        }
    }

    fn apply_defaults(&mut self, defaults: &BTreeMap<String, f64>) {
        for (feature, &default) in defaults {
            if self.has_column(feature) {
                let null_count: usize = self
                    .nodes
                    .values()
                    .map(|s| s.column(feature).iter().filter(|v| v.is_none()).count())
                    .sum();
                if null_count > 0 {
                    info!(
                        feature = %feature,
                        null_count = null_count,
                        default = default,
                        "Filling null values with default"
                    );
                    self.derive(feature.clone(), |s| {
                        s.column(feature)
                            .iter()
                            .map(|v| Some(v.unwrap_or(default)))
                            .collect()
                    });
                }
            } else {
                info!(feature = %feature, default = default, "Creating missing feature with default value");
                self.derive(feature.clone(), |s| vec![Some(default); s.timestamps.len()]);
            }
        }
    }

    fn finalize(self, degraded: bool) -> FeatureTable {
        let mut filled = 0usize;
        let nodes = self
            .nodes
            .into_iter()
            .map(|(id, series)| {
                let values = series
                    .values
                    .into_iter()
                    .map(|(name, column)| {
                        let column: Vec<f64> = column
                            .into_iter()
                            .map(|v| {
                                v.unwrap_or_else(|| {
                                    filled += 1;
                                    0.0
                                })
                            })
                            .collect();
                        (name, column)
                    })
                    .collect();
                let series = NodeSeries {
                    timestamps: series.timestamps,
                    client_types: series.client_types,
                    values,
                };
                (id, series)
            })
            .collect();
        debug!(filled = filled, "Filled undefined derived values with zero");

        FeatureTable {
            columns: self.columns,
            nodes,
            degraded,
        }
    }
}

/// Deterministic transformation of raw history into engineered features
#[derive(Debug, Clone, Default)]
pub struct FeaturePipeline {
    config: FeatureConfig,
}

impl FeaturePipeline {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Engineer features for every node in `samples`
    ///
    /// Fails only when a sample lacks `timestamp` or `node_id`. An internal
    /// derivation failure is logged and the columns derived so far are
    /// returned with [`FeatureTable::is_degraded`] set: a degraded table is
    /// preferred over failing the whole request.
    pub fn engineer(&self, samples: &[NodeMetric]) -> Result<FeatureTable, PipelineError> {
        info!(rows = samples.len(), "Starting feature engineering");

        let mut frame = match Frame::from_samples(samples) {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, "Missing required column in raw history");
                return Err(e);
            }
        };
        debug!(nodes = ?frame.nodes.keys().collect::<Vec<_>>(), "Unique node ids at start");

        frame.apply_defaults(&self.config.feature_defaults);

        let interaction_cols = self.add_interactions(&mut frame);
        let threshold_cols = self.add_thresholds(&mut frame);

        let mut metrics: Vec<String> = Vec::new();
        for name in self
            .config
            .metrics_to_engineer
            .iter()
            .chain(&interaction_cols)
            .chain(&threshold_cols)
        {
            if !metrics.contains(name) {
                metrics.push(name.clone());
            }
        }

        let degraded = match self.add_windowed(&mut frame, &metrics) {
            Ok(()) => false,
            Err(e) => {
                error!(error = %e, "Error in feature engineering pipeline, returning best-effort table");
                true
            }
        };

        let table = frame.finalize(degraded);
        info!(columns = table.columns().len(), "Feature engineering complete");
        Ok(table)
    }

    /// Adds `a_x_b` columns and returns the configured names, valid or not
    fn add_interactions(&self, frame: &mut Frame) -> Vec<String> {
        let pairs = &self.config.interaction_pairs;
        if pairs.is_empty() {
            return Vec::new();
        }
        info!(count = pairs.len(), "Engineering interaction features");

        let mut names = Vec::with_capacity(pairs.len());
        for (a, b) in pairs {
            let name = interaction_column(a, b);
            if frame.has_column(a) && frame.has_column(b) {
                frame.derive(name.clone(), |s| {
                    s.column(a)
                        .iter()
                        .zip(s.column(b))
                        .map(|(x, y)| Some((*x)? * (*y)?))
                        .collect()
                });
            } else {
                warn!(a = %a, b = %b, "Skipping interaction feature for invalid pair");
            }
            names.push(name);
        }
        names
    }

    /// Adds `is_high_<metric>` indicators (1.0 above threshold, else 0.0)
    fn add_thresholds(&self, frame: &mut Frame) -> Vec<String> {
        let thresholds = &self.config.thresholds;
        if thresholds.is_empty() {
            return Vec::new();
        }
        info!(count = thresholds.len(), "Engineering threshold features");

        let mut names = Vec::with_capacity(thresholds.len());
        for (metric, &threshold) in thresholds {
            let name = threshold_column(metric);
            if frame.has_column(metric) {
                frame.derive(name.clone(), |s| {
                    s.column(metric)
                        .iter()
                        .map(|v| match v {
                            Some(v) if *v > threshold => Some(1.0),
                            _ => Some(0.0),
                        })
                        .collect()
                });
            } else {
                warn!(metric = %metric, "Skipping threshold feature for missing column");
            }
            names.push(name);
        }
        names
    }

    fn add_windowed(&self, frame: &mut Frame, metrics: &[String]) -> Result<(), PipelineError> {
        info!(count = metrics.len(), "Engineering rolling/lag features");

        for metric in metrics {
            if !frame.has_column(metric) {
                warn!(metric = %metric, "Column not found for rolling/lag engineering, skipping");
                continue;
            }

            frame.derive(format!("{}_trend", metric), |s| diff(s.column(metric)));

            for &window in &self.config.rolling_windows {
                if window == 0 {
                    return Err(PipelineError::Derivation(format!(
                        "rolling window for '{}' must be positive",
                        metric
                    )));
                }
                frame.derive(format!("{}_rolling_mean_{}", metric, window), |s| {
                    rolling_mean(s.column(metric), window)
                });
                frame.derive(format!("{}_rolling_std_{}", metric, window), |s| {
                    rolling_std(s.column(metric), window)
                });
            }

            for &lag in &self.config.lag_periods {
                frame.derive(format!("{}_lag_{}", metric, lag), |s| shift(s.column(metric), lag));
            }
        }
        Ok(())
    }
}
