//! Run command implementation.

use super::types::RunOptions;
use anyhow::{Context, Result, bail};
use colored::Colorize;
use postline_core::{Pipeline, PipelineConfig, PipelineReport};
use std::io::{BufRead, Write};

/// Execute the run command.
pub async fn execute(options: RunOptions) -> Result<()> {
    let mut config = PipelineConfig::discover_and_load(options.config.as_deref())
        .context("Failed to load configuration")?;
    if options.no_push {
        config.publish.push = false;
    }
    if let Some(provider) = options.provider {
        config.generation.provider = provider;
    }

    let topic = match options.topic {
        Some(topic) => topic,
        None => read_topic()?,
    };
    if topic.trim().is_empty() {
        bail!("No topic given");
    }

    let pipeline = Pipeline::from_config(config).context("Failed to set up model candidates")?;
    if !options.json {
        println!("{}", format!("🚀 Writing about '{}'...", topic.trim()).bold().cyan());
    }
    let report = pipeline.run(&topic).await.context("Pipeline run failed")?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn read_topic() -> Result<String> {
    eprint!("✍️  Topic: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line).context("Failed to read topic from stdin")?;
    Ok(line.trim().to_string())
}

fn print_report(report: &PipelineReport) {
    println!();
    println!("  {} {}", "Title:".bold(), report.title);
    println!("  {} {}", "Bucket:".bold(), report.bucket);
    match &report.candidate {
        Some(candidate) => println!("  {} {}", "Model:".bold(), candidate),
        None => println!("  {} {}", "Model:".bold(), "none answered".yellow()),
    }
    if report.used_fallback {
        println!("  {}", "⚠ Used the fallback record".yellow());
    }
    println!("  {} {}", "File:".bold(), report.publish.path.display());
    if let Some(teaser) = &report.teaser {
        println!("  {} {}", "Teaser:".bold(), teaser.display());
    }
    let stages: Vec<String> = report.stages.iter().map(ToString::to_string).collect();
    println!("  {} {}", "Stages:".bold(), stages.join(" → ").dimmed());
    println!();

    if report.publish.published {
        println!("{}", format!("✓ Published: {}", report.publish.url).green().bold());
    } else {
        println!("{}", format!("⚠ Not pushed; link: {}", report.publish.url).yellow().bold());
    }
}
