//! Flat metrics record produced by one analysis call.
//!
//! Every numeric field is finite and within its documented range. Derived
//! statistics are computed straight from the inputs; the analyzer supplies
//! stage results that already had their defaults substituted.

use std::collections::HashSet;

use flow_types::{Message, MessageRole};
use serde::{Deserialize, Serialize};

use crate::circularity::CircularityAnalysis;
use crate::tokenizer::split_words;
use crate::types::{Topic, TopicTransition};

/// Phrases that mark a message as an insight or acknowledgement.
const INSIGHT_PHRASES: &[&str] = &[
    "i see",
    "i understand",
    "that makes sense",
    "realize",
    "learned",
    "insight",
    "key takeaway",
    "now i get",
    "good point",
    "interesting",
];

/// Phrases that mark a problem as resolved.
const RESOLUTION_PHRASES: &[&str] = &[
    "solved",
    "resolved",
    "fixed",
    "works now",
    "that works",
    "thank you",
    "thanks",
    "perfect",
    "got it",
];

/// Flow metrics for one conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationFlowMetrics {
    pub conversation_id: String,

    // Topic flow
    pub topic_count: usize,
    pub transition_count: usize,
    pub topics: Vec<Topic>,
    pub transitions: Vec<TopicTransition>,

    /// Depth (0 - 100)
    pub depth_score: f64,
    /// Circularity (0.0 - 1.0)
    pub circularity_index: f64,
    /// Coherence (0 - 100)
    pub coherence_score: f64,
    /// Progression (0 - 100)
    pub progression_score: f64,

    pub cycle_count: usize,
    pub max_cycle_length: usize,

    // Timing (ms)
    pub average_topic_duration: f64,
    pub average_transition_time: f64,
    pub min_transition_time: i64,
    pub max_transition_time: i64,
    /// First message to the last resolution message; absent without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_time: Option<i64>,

    // Engagement
    pub message_count: usize,
    pub user_message_count: usize,
    pub assistant_message_count: usize,
    /// Fraction of messages asking a question (0.0 - 1.0)
    pub question_density: f64,
    /// Fraction of messages with an insight phrase (0.0 - 1.0)
    pub insight_density: f64,
    /// 1.0 when user and assistant speak equally often (0.0 - 1.0)
    pub participation_balance: f64,
    /// Mean characters per message
    pub average_message_length: f64,
    /// Unique words over total words (0.0 - 1.0)
    pub vocabulary_richness: f64,

    /// Set when the analysis itself failed and this is a fallback record
    #[serde(default)]
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Stage outputs the record is assembled from.
#[derive(Debug, Clone, Default)]
pub struct FlowParts {
    pub topics: Vec<Topic>,
    pub transitions: Vec<TopicTransition>,
    pub circularity: CircularityAnalysis,
    pub depth: f64,
    pub coherence: f64,
    pub progression: f64,
}

impl ConversationFlowMetrics {
    /// Zeroed record for a conversation without messages.
    pub fn empty(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            ..Default::default()
        }
    }

    /// Zeroed record flagged as a failed analysis.
    pub fn failed(conversation_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: true,
            error_message: Some(message.into()),
            ..Self::empty(conversation_id)
        }
    }

    /// Assemble the record, clamping every score and deriving message stats.
    pub fn assemble(
        conversation_id: impl Into<String>,
        messages: &[Message],
        parts: FlowParts,
    ) -> Self {
        let chronological = chronological(messages);
        let gaps: Vec<i64> = parts.transitions.iter().map(|t| t.time_gap.max(0)).collect();
        let user_message_count = count_role(messages, MessageRole::User);
        let assistant_message_count = count_role(messages, MessageRole::Assistant);

        Self {
            conversation_id: conversation_id.into(),
            topic_count: parts.topics.len(),
            transition_count: parts.transitions.len(),
            depth_score: bounded(parts.depth, 0.0, 100.0, 0.0),
            circularity_index: bounded(parts.circularity.circularity_index, 0.0, 1.0, 0.0),
            coherence_score: bounded(parts.coherence, 0.0, 100.0, 50.0),
            progression_score: bounded(parts.progression, 0.0, 100.0, 50.0),
            cycle_count: parts.circularity.cycle_count,
            max_cycle_length: parts.circularity.max_cycle_length,
            average_topic_duration: average_topic_duration(&chronological, parts.topics.len()),
            average_transition_time: bounded(mean(&gaps), 0.0, f64::MAX, 0.0),
            min_transition_time: gaps.iter().copied().min().unwrap_or(0),
            max_transition_time: gaps.iter().copied().max().unwrap_or(0),
            resolution_time: resolution_time(&chronological),
            message_count: messages.len(),
            user_message_count,
            assistant_message_count,
            question_density: density(messages, Message::is_question),
            insight_density: density(messages, |m| contains_any(&m.content, INSIGHT_PHRASES)),
            participation_balance: participation_balance(
                user_message_count,
                assistant_message_count,
            ),
            average_message_length: average_message_length(messages),
            vocabulary_richness: vocabulary_richness(messages),
            topics: parts.topics,
            transitions: parts.transitions,
            error: false,
            error_message: None,
        }
    }
}

/// Clamp to `[min, max]`, mapping NaN and infinities to `default`.
fn bounded(value: f64, min: f64, max: f64, default: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        default
    }
}

fn mean(values: &[i64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64
}

/// Messages ordered by timestamp; ties keep input order.
fn chronological(messages: &[Message]) -> Vec<&Message> {
    let mut ordered: Vec<&Message> = messages.iter().collect();
    ordered.sort_by_key(|m| m.timestamp_ms());
    ordered
}

fn count_role(messages: &[Message], role: MessageRole) -> usize {
    messages.iter().filter(|m| m.role == role).count()
}

fn density(messages: &[Message], predicate: impl Fn(&Message) -> bool) -> f64 {
    if messages.is_empty() {
        return 0.0;
    }
    let hits = messages.iter().filter(|m| predicate(*m)).count();
    bounded(hits as f64 / messages.len() as f64, 0.0, 1.0, 0.0)
}

fn contains_any(content: &str, phrases: &[&str]) -> bool {
    let lowered = content.to_lowercase();
    phrases.iter().any(|phrase| lowered.contains(*phrase))
}

fn participation_balance(user: usize, assistant: usize) -> f64 {
    let total = user + assistant;
    if total == 0 {
        return 0.0;
    }
    let difference = user.abs_diff(assistant) as f64;
    bounded(1.0 - difference / total as f64, 0.0, 1.0, 0.0)
}

fn average_message_length(messages: &[Message]) -> f64 {
    if messages.is_empty() {
        return 0.0;
    }
    let chars: usize = messages.iter().map(|m| m.content.chars().count()).sum();
    bounded(chars as f64 / messages.len() as f64, 0.0, f64::MAX, 0.0)
}

fn vocabulary_richness(messages: &[Message]) -> f64 {
    let words: Vec<String> = messages.iter().flat_map(|m| split_words(&m.content)).collect();
    if words.is_empty() {
        return 0.0;
    }
    let unique: HashSet<&String> = words.iter().collect();
    bounded(unique.len() as f64 / words.len() as f64, 0.0, 1.0, 0.0)
}

fn average_topic_duration(chronological: &[&Message], topic_count: usize) -> f64 {
    let (Some(first), Some(last)) = (chronological.first(), chronological.last()) else {
        return 0.0;
    };
    if topic_count == 0 {
        return 0.0;
    }
    let span = last.timestamp_ms().saturating_sub(first.timestamp_ms()).max(0);
    bounded(span as f64 / topic_count as f64, 0.0, f64::MAX, 0.0)
}

fn resolution_time(chronological: &[&Message]) -> Option<i64> {
    let first = chronological.first()?.timestamp_ms();
    chronological
        .iter()
        .rev()
        .find(|m| contains_any(&m.content, RESOLUTION_PHRASES))
        .map(|m| m.timestamp_ms().saturating_sub(first).max(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransitionType;
    use chrono::{TimeZone, Utc};

    fn message(role: MessageRole, content: &str, ts_ms: i64) -> Message {
        Message::new("conv-1", role, content, Utc.timestamp_millis_opt(ts_ms).unwrap())
    }

    fn transition(gap: i64) -> TopicTransition {
        TopicTransition {
            from_topic: "a".to_string(),
            to_topic: "b".to_string(),
            timestamp: 0,
            transition_type: TransitionType::Tangent,
            confidence: 0.5,
            time_gap: gap,
        }
    }

    fn sample_messages() -> Vec<Message> {
        vec![
            message(MessageRole::User, "How do I fix the borrow error?", 0),
            message(MessageRole::Assistant, "Clone the value before the move.", 1_000),
            message(MessageRole::User, "I see, that makes sense.", 2_000),
            message(MessageRole::Assistant, "Anything else?", 3_000),
            message(MessageRole::User, "No, it works now. Thanks!", 4_000),
        ]
    }

    #[test]
    fn test_empty_record_is_zeroed() {
        let metrics = ConversationFlowMetrics::empty("conv-1");
        assert_eq!(metrics.conversation_id, "conv-1");
        assert_eq!(metrics.topic_count, 0);
        assert_eq!(metrics.message_count, 0);
        assert!(metrics.depth_score.abs() < f64::EPSILON);
        assert!(metrics.coherence_score.abs() < f64::EPSILON);
        assert!(!metrics.error);
        assert!(metrics.resolution_time.is_none());
    }

    #[test]
    fn test_failed_record_carries_message() {
        let metrics = ConversationFlowMetrics::failed("conv-1", "boom");
        assert!(metrics.error);
        assert_eq!(metrics.error_message.as_deref(), Some("boom"));
        assert_eq!(metrics.topic_count, 0);
    }

    #[test]
    fn test_assemble_message_stats() {
        let messages = sample_messages();
        let metrics = ConversationFlowMetrics::assemble("conv-1", &messages, FlowParts::default());

        assert_eq!(metrics.message_count, 5);
        assert_eq!(metrics.user_message_count, 3);
        assert_eq!(metrics.assistant_message_count, 2);
        assert!((metrics.question_density - 0.4).abs() < 1e-9);
        assert!((metrics.insight_density - 0.2).abs() < 1e-9);
        assert!((metrics.participation_balance - 0.8).abs() < 1e-9);
        assert_eq!(metrics.resolution_time, Some(4_000));
        assert!(metrics.vocabulary_richness > 0.0);
        assert!(metrics.vocabulary_richness <= 1.0);
    }

    #[test]
    fn test_resolution_time_uses_last_match() {
        let messages = vec![
            message(MessageRole::User, "Thanks, trying it", 100),
            message(MessageRole::User, "It is still broken", 600),
            message(MessageRole::User, "Fixed it!", 2_100),
            message(MessageRole::Assistant, "Great to hear", 3_000),
        ];
        assert_eq!(resolution_time(&chronological(&messages)), Some(2_000));
    }

    #[test]
    fn test_resolution_time_absent() {
        let messages = vec![message(MessageRole::User, "Still stuck here", 0)];
        assert_eq!(resolution_time(&chronological(&messages)), None);
    }

    #[test]
    fn test_resolution_time_ignores_input_order() {
        let messages = vec![
            message(MessageRole::User, "Perfect", 5_000),
            message(MessageRole::User, "Start", 1_000),
        ];
        assert_eq!(resolution_time(&chronological(&messages)), Some(4_000));
    }

    #[test]
    fn test_transition_timing() {
        let parts = FlowParts {
            transitions: vec![transition(1_000), transition(3_000), transition(5_000)],
            ..Default::default()
        };
        let metrics = ConversationFlowMetrics::assemble("c", &sample_messages(), parts);
        assert!((metrics.average_transition_time - 3_000.0).abs() < 1e-9);
        assert_eq!(metrics.min_transition_time, 1_000);
        assert_eq!(metrics.max_transition_time, 5_000);
        assert_eq!(metrics.transition_count, 3);
    }

    #[test]
    fn test_average_topic_duration() {
        let topics = vec![
            Topic::new("borrow error", "m1", 0, 0.8, 1.5),
            Topic::new("clone value", "m2", 1_000, 0.8, 1.5),
        ];
        let parts = FlowParts {
            topics,
            ..Default::default()
        };
        let metrics = ConversationFlowMetrics::assemble("c", &sample_messages(), parts);
        // span 4000 ms over 2 topics
        assert!((metrics.average_topic_duration - 2_000.0).abs() < 1e-9);
        assert_eq!(metrics.topic_count, 2);
    }

    #[test]
    fn test_scores_are_clamped_and_finite() {
        let parts = FlowParts {
            circularity: CircularityAnalysis {
                circularity_index: f64::NAN,
                ..Default::default()
            },
            depth: 250.0,
            coherence: f64::INFINITY,
            progression: -3.0,
            ..Default::default()
        };
        let metrics = ConversationFlowMetrics::assemble("c", &sample_messages(), parts);
        assert!((metrics.depth_score - 100.0).abs() < f64::EPSILON);
        assert!(metrics.circularity_index.abs() < f64::EPSILON);
        assert!((metrics.coherence_score - 50.0).abs() < f64::EPSILON);
        assert!(metrics.progression_score.abs() < f64::EPSILON);
    }

    #[test]
    fn test_participation_balance_edges() {
        assert!(participation_balance(0, 0).abs() < f64::EPSILON);
        assert!((participation_balance(2, 2) - 1.0).abs() < f64::EPSILON);
        assert!(participation_balance(3, 0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_json_keys_are_camel_case() {
        let metrics = ConversationFlowMetrics::failed("conv-1", "boom");
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["conversationId"], "conv-1");
        assert_eq!(json["circularityIndex"], 0.0);
        assert_eq!(json["errorMessage"], "boom");
        assert!(json.get("resolutionTime").is_none());
    }
}
