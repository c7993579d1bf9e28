//! Topic and transition types.

use serde::{Deserialize, Serialize};

/// Identifier of a topic, valid within a single analysis call.
pub type TopicId = String;

/// Number of trailing message-id characters folded into a topic id.
const MESSAGE_SUFFIX_LEN: usize = 8;

/// A topic extracted from one or more messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    /// Derived from normalized content and the originating message id
    pub id: TopicId,
    /// Topic text as extracted
    pub content: String,
    /// Lowercased, trimmed content; the merge key
    pub normalized_content: String,
    /// Timestamp of the originating message (ms since epoch)
    pub timestamp: i64,
    /// Originating message
    pub message_id: String,
    /// Confidence (0.0 - 1.0)
    pub confidence: f64,
    /// Accumulated weight (>= 0.0)
    pub weight: f64,
}

impl Topic {
    /// Create a topic, deriving its normalized content and id.
    pub fn new(
        content: impl Into<String>,
        message_id: &str,
        timestamp: i64,
        confidence: f64,
        weight: f64,
    ) -> Self {
        let content = content.into();
        let normalized_content = normalize(&content);
        Self {
            id: topic_id(&normalized_content, message_id),
            content,
            normalized_content,
            timestamp,
            message_id: message_id.to_string(),
            confidence: confidence.clamp(0.0, 1.0),
            weight: weight.max(0.0),
        }
    }

    /// Whitespace-separated words of the normalized content.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.normalized_content.split_whitespace()
    }
}

/// Normalize topic text for comparison.
pub fn normalize(content: &str) -> String {
    content.trim().to_lowercase()
}

fn topic_id(normalized: &str, message_id: &str) -> TopicId {
    let chars: Vec<char> = message_id.chars().collect();
    let suffix: String = chars[chars.len().saturating_sub(MESSAGE_SUFFIX_LEN)..]
        .iter()
        .collect();
    format!("{}_{}", normalized.replace(' ', "-"), suffix)
}

/// Kind of move between two consecutive topics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransitionType {
    /// Topics share most of their wording
    Natural,
    /// The next topic arrived almost immediately
    Abrupt,
    /// The conversation went back to earlier context
    Return,
    /// Unrelated move
    Tangent,
}

impl std::fmt::Display for TransitionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionType::Natural => write!(f, "natural"),
            TransitionType::Abrupt => write!(f, "abrupt"),
            TransitionType::Return => write!(f, "return"),
            TransitionType::Tangent => write!(f, "tangent"),
        }
    }
}

/// Directed move from one topic to the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicTransition {
    /// Source topic
    pub from_topic: TopicId,
    /// Target topic
    pub to_topic: TopicId,
    /// When the target topic appeared (ms since epoch)
    pub timestamp: i64,
    /// Classification
    pub transition_type: TransitionType,
    /// Confidence (0.0 - 1.0)
    pub confidence: f64,
    /// Time between the two topics (ms, >= 0)
    pub time_gap: i64,
}
