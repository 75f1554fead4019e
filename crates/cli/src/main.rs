//! Vigil CLI
//!
//! Command-line access to the Vigil routing prediction service: health,
//! loaded models and routing recommendations for a metrics batch.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{health, models, recommend};
use std::path::PathBuf;

const DEFAULT_API_URL: &str = "http://localhost:8001";

/// Vigil routing CLI
#[derive(Parser)]
#[command(name = "vigil")]
#[command(author, version, about = "CLI for the Vigil node routing service", long_about = None)]
pub struct Cli {
    /// Service URL (can also be set via VIGIL_API_URL or the config file)
    #[arg(long, env = "VIGIL_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show service health and readiness
    Health,

    /// Show loaded models and decision weights
    Models,

    /// Request a routing recommendation for a metrics batch
    Recommend {
        /// JSON file holding `{"metrics": [...]}` or a bare array of samples
        #[arg(long, short = 'i')]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = config::Config::load()?;

    let api_url = cli
        .api_url
        .or(settings.api_url)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let format = cli.format.or(settings.default_format).unwrap_or_default();

    let client = client::ApiClient::new(&api_url)?;

    match cli.command {
        Commands::Health => health::show_health(&client, format).await?,
        Commands::Models => models::show_models(&client, format).await?,
        Commands::Recommend { file } => recommend::recommend(&client, &file, format).await?,
    }

    Ok(())
}
