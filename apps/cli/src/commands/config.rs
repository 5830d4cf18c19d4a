//! Config command implementation.

use super::types::ConfigCommand;
use anyhow::{Context, Result, bail};
use colored::Colorize;
use postline_core::PipelineConfig;

/// Execute a config subcommand.
pub fn execute(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show { config } => {
            let config = PipelineConfig::discover_and_load(config.as_deref())
                .context("Failed to load configuration")?;
            let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
            println!("{}", rendered);
            Ok(())
        }
        ConfigCommand::Init { path, force } => {
            let path = path.unwrap_or_else(PipelineConfig::default_local_path);
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            PipelineConfig::default().save_to_file(&path).context("Failed to write configuration")?;
            println!("{}", format!("✓ Wrote {}", path.display()).green().bold());
            Ok(())
        }
    }
}
