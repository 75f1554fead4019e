//! Routing recommendation command

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use tabled::Tabled;

use crate::client::{ApiClient, MetricsBatch, RoutingRecommendation};
use crate::output::{
    color_probability, color_status, format_latency, print_info, print_json, print_warning,
    OutputFormat,
};

#[derive(Tabled)]
struct PredictionRow {
    #[tabled(rename = "")]
    marker: String,
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Latency")]
    latency: String,
    #[tabled(rename = "Failure")]
    failure: String,
    #[tabled(rename = "Anomaly")]
    anomaly: String,
}

/// Read a batch file: `{"metrics": [...]}` or a bare array of samples
pub fn read_batch(path: &Path) -> Result<MetricsBatch> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    match value {
        serde_json::Value::Array(metrics) => Ok(MetricsBatch { metrics }),
        other => serde_json::from_value(other)
            .with_context(|| format!("{} is neither a batch object nor an array", path.display())),
    }
}

pub async fn recommend(client: &ApiClient, file: &Path, format: OutputFormat) -> Result<()> {
    let batch = read_batch(file)?;
    let rec: RoutingRecommendation = client.post("predict", &batch).await?;

    match format {
        OutputFormat::Json => print_json(&rec)?,
        OutputFormat::Table => {
            if rec.all_predictions.is_empty() {
                print_warning(&rec.explanation);
                return Ok(());
            }

            let rows: Vec<PredictionRow> = rec
                .all_predictions
                .iter()
                .map(|p| PredictionRow {
                    marker: if p.node_id == rec.recommended_node {
                        "→".green().bold().to_string()
                    } else {
                        String::new()
                    },
                    node: p.node_id.clone(),
                    cost: format!("{:.4}", p.cost_score),
                    latency: format_latency(p.predicted_latency_ms),
                    failure: color_probability(p.failure_prob),
                    anomaly: if p.anomaly_detected {
                        "yes".red().to_string()
                    } else {
                        "no".to_string()
                    },
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!(
                "\n{} {} ({})",
                "Recommended:".bold(),
                rec.recommended_node.cyan(),
                color_status(&rec.mode)
            );
            print_info(&rec.explanation);
        }
    }

    Ok(())
}
