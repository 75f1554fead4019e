//! Service health command

use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use tabled::Tabled;

use crate::client::{ApiClient, HealthResponse, ReadinessResponse};
use crate::output::{color_status, print_json, print_success, print_warning, OutputFormat};

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health: HealthResponse = client.get_any_status("healthz").await?;
    let readiness: ReadinessResponse = client.get_any_status("readyz").await?;

    match format {
        OutputFormat::Json => print_json(&json!({ "health": health, "readiness": readiness }))?,
        OutputFormat::Table => {
            println!("{} {}", "Status:".bold(), color_status(&health.status));

            if !health.components.is_empty() {
                let rows: Vec<ComponentRow> = health
                    .components
                    .iter()
                    .map(|(name, c)| ComponentRow {
                        name: name.clone(),
                        status: color_status(&c.status),
                        message: c.message.clone().unwrap_or_default(),
                    })
                    .collect();

                let table = tabled::Table::new(rows)
                    .with(tabled::settings::Style::rounded())
                    .to_string();
                println!("{}", table);
            }

            if readiness.ready {
                print_success("Service is ready");
            } else {
                print_warning(&format!(
                    "Service is not ready: {}",
                    readiness.reason.as_deref().unwrap_or("unknown reason")
                ));
            }
        }
    }

    Ok(())
}
