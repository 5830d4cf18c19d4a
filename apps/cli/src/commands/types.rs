//! Command type definitions shared between main.rs and the command modules.

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Options for `postline run`.
#[derive(Args, Debug, Clone, Default)]
pub struct RunOptions {
    /// Topic to write about (read from stdin when omitted)
    pub topic: Option<String>,

    /// Config file (replaces ./.postlinerc)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// Write files locally without committing or pushing
    #[arg(long)]
    pub no_push: bool,

    /// Override the model provider (gemini, mock)
    #[arg(long)]
    pub provider: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show {
        /// Config file (replaces ./.postlinerc)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write the default configuration to a file
    Init {
        /// Target path (defaults to ./.postlinerc)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
