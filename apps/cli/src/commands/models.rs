//! Models command implementation.

use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use postline_core::PipelineConfig;
use postline_models::GeminiModel;
use postline_models::gemini::DEFAULT_BASE_URL;
use std::path::Path;

/// Execute the models command: list models that can generate content.
pub async fn execute(config_path: Option<&Path>, json_output: bool) -> Result<()> {
    let config = PipelineConfig::discover_and_load(config_path).context("Failed to load configuration")?;
    let api_key = config
        .generation
        .api_key
        .as_deref()
        .ok_or_else(|| anyhow!("GEMINI_API_KEY is not set"))?;
    let base_url = config.generation.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);

    let models = GeminiModel::list_models(base_url, api_key)
        .await
        .context("Failed to list models")?;
    let candidates = config.candidate_ids();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&models)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("📋 Available Models ({})", models.len()).bold().cyan());
    println!();
    for name in &models {
        let id = name.strip_prefix("models/").unwrap_or(name);
        if candidates.iter().any(|c| c == id) {
            println!("  {} {}", id.green(), "(candidate)".dimmed());
        } else {
            println!("  {}", id);
        }
    }
    println!();
    Ok(())
}
