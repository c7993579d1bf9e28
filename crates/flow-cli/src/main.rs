//! Conversation Flow Analyzer
//!
//! Reports topic flow metrics for a stored conversation.
//!
//! # Usage
//!
//! ```bash
//! flow-analyzer analyze <input.json> [--strict] [--compact]
//! flow-analyzer topics <input.json> [--limit N]
//! flow-analyzer config
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/flow-analyzer/config.toml)
//! 3. File passed with --config
//! 4. Environment variables (FLOW_*)
//! 5. CLI flags

use anyhow::{Context, Result};
use clap::Parser;

use flow_cli::{handle_analyze, handle_topics, init_logging, show_config, Cli, Commands, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(log_level) = cli.log_level {
        settings.log_level = log_level;
    }
    init_logging(&settings.log_level)?;

    match cli.command {
        Commands::Analyze {
            input,
            strict,
            compact,
        } => {
            handle_analyze(&settings, &input, strict, compact).await?;
        }
        Commands::Topics {
            input,
            limit,
            compact,
        } => {
            handle_topics(&settings, &input, limit, compact)?;
        }
        Commands::Config => {
            show_config(&settings)?;
        }
    }

    Ok(())
}
