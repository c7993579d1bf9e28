//! Command implementations for the flow analyzer.
//!
//! Handles:
//! - analyze: Read a conversation file and print its flow metrics
//! - topics: Print the topics extracted from a conversation file
//! - config: Print the effective settings

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use flow_analysis::{
    ConversationFlowAnalyzer, ConversationFlowMetrics, EmptyConversationPolicy, Topic,
};
use flow_types::ConversationInput;

use crate::settings::Settings;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. Logs go to stderr so stdout
/// carries only command output.
pub fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Read and validate a conversation input file.
pub fn load_input(path: &Path) -> Result<ConversationInput> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file {}", path.display()))?;
    let input = ConversationInput::from_json(&text)
        .with_context(|| format!("Failed to parse input file {}", path.display()))?;
    input.validate().context("Invalid conversation input")?;
    debug!(
        conversation_id = %input.conversation.id,
        messages = input.messages.len(),
        "Loaded conversation input"
    );
    Ok(input)
}

/// Analyze the conversation stored in `path`.
///
/// `strict` turns an empty conversation into an error regardless of the
/// configured policy.
pub async fn analyze_file(
    settings: &Settings,
    path: &Path,
    strict: bool,
) -> Result<ConversationFlowMetrics> {
    let mut config = settings.analyzer.clone();
    if strict {
        config.empty_conversation = EmptyConversationPolicy::Reject;
    }
    let analyzer =
        ConversationFlowAnalyzer::new(config).context("Invalid analyzer configuration")?;

    let input = load_input(path)?;
    let metrics = analyzer
        .analyze_flow(&input.conversation, &input.messages)
        .await
        .with_context(|| format!("Failed to analyze conversation {}", input.conversation.id))?;

    info!(
        conversation_id = %metrics.conversation_id,
        topics = metrics.topic_count,
        circularity = metrics.circularity_index,
        "Analysis complete"
    );
    Ok(metrics)
}

/// Extract topics from the conversation stored in `path`, heaviest first.
pub fn extract_file_topics(
    settings: &Settings,
    path: &Path,
    limit: Option<usize>,
) -> Result<Vec<Topic>> {
    let analyzer = ConversationFlowAnalyzer::new(settings.analyzer.clone())
        .context("Invalid analyzer configuration")?;
    let input = load_input(path)?;

    let mut topics = analyzer.extractor().extract_topics(&input.messages);
    if let Some(limit) = limit {
        topics.truncate(limit);
    }
    Ok(topics)
}

/// Render a value as JSON.
pub fn render_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    text.context("Failed to serialize output")
}

/// Render settings as TOML.
pub fn render_settings(settings: &Settings) -> Result<String> {
    toml::to_string_pretty(settings).context("Failed to serialize settings")
}

/// Handle the analyze command.
pub async fn handle_analyze(
    settings: &Settings,
    input: &Path,
    strict: bool,
    compact: bool,
) -> Result<()> {
    let metrics = analyze_file(settings, input, strict).await?;
    println!("{}", render_json(&metrics, settings.pretty && !compact)?);
    Ok(())
}

/// Handle the topics command.
pub fn handle_topics(
    settings: &Settings,
    input: &Path,
    limit: Option<usize>,
    compact: bool,
) -> Result<()> {
    let topics = extract_file_topics(settings, input, limit)?;
    println!("{}", render_json(&topics, settings.pretty && !compact)?);
    Ok(())
}

/// Handle the config command.
pub fn show_config(settings: &Settings) -> Result<()> {
    print!("{}", render_settings(settings)?);
    Ok(())
}
