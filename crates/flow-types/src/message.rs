//! Message type for conversation analysis.
//!
//! Messages are immutable records of a single conversation turn. The
//! analysis engine only reads them; ordering by `created_at` is expected
//! but not relied upon.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of the message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// User input
    User,
    /// Assistant response
    Assistant,
    /// System message
    System,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// A single conversation message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique identifier (ULID string when generated locally)
    pub id: String,

    /// Conversation this message belongs to
    pub conversation_id: String,

    /// Role of the author
    pub role: MessageRole,

    /// Message text
    #[serde(default)]
    pub content: String,

    /// When the message was written
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a new message with a freshly generated ULID.
    pub fn new(
        conversation_id: impl Into<String>,
        role: MessageRole,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            conversation_id: conversation_id.into(),
            role,
            content: content.into(),
            created_at,
        }
    }

    /// Replace the generated id with an explicit one.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Get timestamp as milliseconds since Unix epoch
    pub fn timestamp_ms(&self) -> i64 {
        self.created_at.timestamp_millis()
    }

    /// Whether the message text contains a question mark.
    pub fn is_question(&self) -> bool {
        self.content.contains('?')
    }

    /// Whether the author is the user.
    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }
}
