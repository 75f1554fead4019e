//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Pretty-print any response as JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Probability as a percentage
pub fn format_probability(prob: f64) -> String {
    format!("{:.2}%", prob * 100.0)
}

pub fn format_latency(ms: f64) -> String {
    format!("{:.0}ms", ms)
}

/// Failure probability colored by risk
pub fn color_probability(prob: f64) -> String {
    let formatted = format_probability(prob);
    if prob < 0.2 {
        formatted.green().to_string()
    } else if prob < 0.5 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "running" | "ready" | "cost_weighted" => status.green().to_string(),
        "degraded" | "latency_fallback" => status.yellow().to_string(),
        "unhealthy" | "not ready" | "no_candidates" => status.red().to_string(),
        _ => status.to_string(),
    }
}
