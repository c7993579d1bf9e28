//! End-to-end test infrastructure for conversation flow analysis.
//!
//! Provides conversation fixtures and a shared analyzer for tests that run
//! the full extract-to-metrics pipeline.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use flow_analysis::{AnalyzerConfig, ConversationFlowAnalyzer, EmptyConversationPolicy};
use flow_types::{Conversation, Message, MessageRole};

/// Base timestamp for fixtures (2024-01-29 approx).
pub const BASE_TS: i64 = 1_706_540_400_000;

/// Build a conversation header starting at [`BASE_TS`].
pub fn create_conversation(id: &str) -> Conversation {
    Conversation::new(id, timestamp(BASE_TS)).with_title(format!("Fixture {id}"))
}

/// Shared analyzer with default configuration.
pub fn shared_analyzer() -> Arc<ConversationFlowAnalyzer> {
    Arc::new(ConversationFlowAnalyzer::default())
}

/// Analyzer that rejects conversations without messages.
pub fn strict_analyzer() -> ConversationFlowAnalyzer {
    ConversationFlowAnalyzer::new(AnalyzerConfig {
        empty_conversation: EmptyConversationPolicy::Reject,
        ..Default::default()
    })
    .expect("Default config with Reject policy is valid")
}

/// Create N test messages with sequential timestamps.
///
/// Messages are created with ULID-based IDs, 100ms apart, alternating user
/// and assistant, using the given base text as a template (appending index).
pub fn create_test_messages(conversation_id: &str, count: usize, base_text: &str) -> Vec<Message> {
    (0..count)
        .map(|i| {
            let ts_ms = BASE_TS + (i as i64 * 100);
            let role = if i % 2 == 0 {
                MessageRole::User
            } else {
                MessageRole::Assistant
            };
            let text = format!("{} (message {})", base_text, i);
            build_message(conversation_id, ts_ms, role, text)
        })
        .collect()
}

/// Create messages from a script of `(role, content)` turns, `gap_ms` apart.
pub fn messages_from_script(
    conversation_id: &str,
    script: &[(MessageRole, &str)],
    gap_ms: i64,
) -> Vec<Message> {
    script
        .iter()
        .enumerate()
        .map(|(i, (role, content))| {
            build_message(conversation_id, BASE_TS + i as i64 * gap_ms, *role, *content)
        })
        .collect()
}

/// A conversation that moves through distinct questions without revisiting any.
pub fn linear_script() -> Vec<(MessageRole, &'static str)> {
    vec![
        (MessageRole::User, "What is Rust ownership?"),
        (MessageRole::Assistant, "Ownership moves values between bindings."),
        (MessageRole::User, "How does borrowing work?"),
        (MessageRole::Assistant, "Borrowing lends access without moving."),
        (MessageRole::User, "Why are lifetimes needed?"),
        (MessageRole::Assistant, "Lifetimes prove references stay valid."),
        (MessageRole::User, "When should threads share data?"),
        (MessageRole::Assistant, "Wrap shared state inside Arc."),
        (MessageRole::User, "Got it, thanks!"),
    ]
}

/// A conversation that keeps asking the same question.
pub fn repeated_script() -> Vec<(MessageRole, &'static str)> {
    vec![
        (MessageRole::User, "What is React?"),
        (MessageRole::Assistant, "React renders components."),
        (MessageRole::User, "What is React?"),
        (MessageRole::Assistant, "React is a view library."),
        (MessageRole::User, "What is React?"),
    ]
}

fn build_message(
    conversation_id: &str,
    ts_ms: i64,
    role: MessageRole,
    content: impl Into<String>,
) -> Message {
    let ulid = ulid::Ulid::from_parts(ts_ms as u64, rand::random());
    Message::new(conversation_id, role, content, timestamp(ts_ms)).with_id(ulid.to_string())
}

fn timestamp(ts_ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ts_ms)
        .single()
        .unwrap_or_else(Utc::now)
}
