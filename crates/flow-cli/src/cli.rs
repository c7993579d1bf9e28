//! CLI argument parsing for the flow analyzer.
//!
//! Flags given here override every other configuration source.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Conversation Flow Analyzer
///
/// Extracts topics from a conversation, links them into a transition graph
/// and reports circularity, depth, coherence and progression.
#[derive(Parser, Debug)]
#[command(name = "flow-analyzer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/flow-analyzer/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Analyzer commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a conversation and print its flow metrics as JSON
    Analyze {
        /// Input JSON file with `conversation` and `messages`
        input: PathBuf,

        /// Fail on a conversation without messages
        #[arg(long)]
        strict: bool,

        /// Print single-line JSON
        #[arg(long)]
        compact: bool,
    },

    /// Print the topics extracted from a conversation
    Topics {
        /// Input JSON file with `conversation` and `messages`
        input: PathBuf,

        /// Maximum topics to print
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Print single-line JSON
        #[arg(long)]
        compact: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}
