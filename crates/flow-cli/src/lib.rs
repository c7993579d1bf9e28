//! Flow analyzer CLI library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (analyze, topics, config)
//! - `settings`: Layered configuration loading

pub mod cli;
pub mod commands;
pub mod settings;

pub use cli::{Cli, Commands};
pub use commands::{
    analyze_file, extract_file_topics, handle_analyze, handle_topics, init_logging, load_input,
    render_json, render_settings, show_config,
};
pub use settings::Settings;
