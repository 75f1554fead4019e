//! Feature engineering for routing inference
//!
//! Turns raw multi-node telemetry history into one engineered feature table
//! with interaction, threshold, trend, rolling and lag columns computed
//! independently per node.

mod pipeline;
mod table;
pub mod window;

pub use crate::config::FeatureConfig;
pub use pipeline::{
    insufficient_history, interaction_column, threshold_column, FeaturePipeline,
    METADATA_COLUMNS,
};
pub use table::{FeatureRow, FeatureTable, LiveFeatureMap, NodeSeries};
