//! Engineered feature table and live feature rows

use crate::error::InferenceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Most recent engineered row per node, the input to one decision request
pub type LiveFeatureMap = BTreeMap<String, FeatureRow>;

/// Engineered history of one node, sorted by timestamp
#[derive(Debug, Clone, Default)]
pub struct NodeSeries {
    pub(crate) timestamps: Vec<DateTime<Utc>>,
    pub(crate) client_types: Vec<String>,
    pub(crate) values: HashMap<String, Vec<f64>>,
}

impl NodeSeries {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn client_types(&self) -> &[String] {
        &self.client_types
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.values.get(name).map(|v| v.as_slice())
    }

    fn row(&self, node_id: &str, idx: usize) -> Option<FeatureRow> {
        let timestamp = *self.timestamps.get(idx)?;
        let client_type = self.client_types.get(idx)?.clone();
        let values = self
            .values
            .iter()
            .filter_map(|(name, column)| column.get(idx).map(|v| (name.clone(), *v)))
            .collect();
        Some(FeatureRow {
            node_id: node_id.to_string(),
            client_type,
            timestamp,
            values,
        })
    }
}

/// Output of the feature pipeline: every node shares the same column set
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    pub(crate) columns: Vec<String>,
    pub(crate) nodes: BTreeMap<String, NodeSeries>,
    pub(crate) degraded: bool,
}

impl FeatureTable {
    /// Numeric columns in creation order (metadata columns excluded)
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// True when derivation stopped early and some columns are missing
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Node ids in sorted order
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|k| k.as_str())
    }

    pub fn node(&self, node_id: &str) -> Option<&NodeSeries> {
        self.nodes.get(node_id)
    }

    pub fn column(&self, node_id: &str, name: &str) -> Option<&[f64]> {
        self.nodes.get(node_id).and_then(|n| n.column(name))
    }

    /// Total number of rows across all nodes
    pub fn row_count(&self) -> usize {
        self.nodes.values().map(|n| n.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Engineered row at `idx` in a node's time order
    pub fn row(&self, node_id: &str, idx: usize) -> Option<FeatureRow> {
        self.nodes.get(node_id)?.row(node_id, idx)
    }

    /// Most recent row of every node
    pub fn latest_rows(&self) -> LiveFeatureMap {
        self.nodes
            .iter()
            .filter_map(|(id, series)| {
                let last = series.len().checked_sub(1)?;
                series.row(id, last).map(|row| (id.clone(), row))
            })
            .collect()
    }
}

/// One engineered feature vector for one node at one timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub node_id: String,
    pub client_type: String,
    pub timestamp: DateTime<Utc>,
    pub values: BTreeMap<String, f64>,
}

impl FeatureRow {
    pub fn new(node_id: impl Into<String>, client_type: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            node_id: node_id.into(),
            client_type: client_type.into(),
            timestamp,
            values: BTreeMap::new(),
        }
    }

    /// Set a feature value
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Values of `names` in order; fails on the first absent feature
    pub fn vector(&self, names: &[String]) -> Result<Vec<f64>, InferenceError> {
        names
            .iter()
            .map(|name| {
                self.get(name)
                    .ok_or_else(|| InferenceError::MissingFeature(name.clone()))
            })
            .collect()
    }
}
