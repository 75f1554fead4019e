//! Loaded model inventory command

use anyhow::Result;
use colored::Colorize;

use crate::client::{ApiClient, ModelsInfo};
use crate::output::{print_json, print_warning, OutputFormat};

pub async fn show_models(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let models: ModelsInfo = client.get("models").await?;

    match format {
        OutputFormat::Json => print_json(&models)?,
        OutputFormat::Table => {
            println!("{}", "Loaded Models".bold());
            println!("{}", "=".repeat(40));
            println!("Anomaly model:   {}", models.anomaly_model.cyan());
            println!("Failure model:   {}", models.failure_model.cyan());
            println!("Feature count:   {}", models.feature_count);
            println!(
                "Weights:         failure {:.2}, latency {:.2}",
                models.config.weight_failure, models.config.weight_latency
            );
            println!("History size:    {}", models.config.prediction_history_size);
            println!();

            if models.latency_models.is_empty() {
                print_warning("No latency models loaded");
            } else {
                println!(
                    "{} ({})",
                    "Latency models".bold(),
                    models.total_latency_models
                );
                for node in &models.latency_models {
                    println!("  - {}", node);
                }
            }
        }
    }

    Ok(())
}
