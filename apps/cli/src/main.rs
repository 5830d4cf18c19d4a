//! Postline CLI - turn a topic into a published post.
//!
//! Provides the `postline` command: generate a post with the configured model
//! candidates, render its chart, write it into the site repository and push.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::types::{ConfigCommand, RunOptions};

/// Postline - topic-to-post publishing pipeline
#[derive(Parser, Debug)]
#[command(
    name = "postline",
    author,
    version,
    about = "Postline - generate, chart and publish a post from one topic"
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate and publish one post
    Run(RunOptions),

    /// List provider models that support content generation
    Models {
        /// Config file (replaces ./.postlinerc)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or create configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let result = match args.command {
        Command::Run(options) => commands::run::execute(options).await,
        Command::Models { config, json } => commands::models::execute(config.as_deref(), json).await,
        Command::Config(command) => commands::config::execute(command),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
    Ok(())
}
