//! Analysis error types.

use thiserror::Error;

/// Errors that can occur during flow analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// No messages to analyze and the caller asked for a hard failure
    #[error("Empty conversation: {0}")]
    EmptyConversation(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Not enough data for a calculation to be meaningful
    #[error("Insufficient data: {0}")]
    InsufficientData(&'static str),

    /// A calculation produced NaN or infinity
    #[error("Non-finite value in {0}")]
    NonFinite(&'static str),

    /// A pipeline stage failed as a whole
    #[error("Stage {stage} failed: {reason}")]
    Stage {
        /// Stage name
        stage: &'static str,
        /// Failure description
        reason: String,
    },
}
