//! Conversation header and the analysis input bundle.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FlowError;
use crate::message::Message;

/// Header record for a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique identifier
    pub id: String,

    /// When the conversation was started
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    /// When the conversation was last touched
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,

    /// Optional human-readable title
    #[serde(default)]
    pub title: Option<String>,

    /// Free-form caller metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Conversation {
    /// Create a conversation whose created/updated timestamps are both `created_at`.
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at,
            updated_at: created_at,
            title: None,
            metadata: HashMap::new(),
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Replace the metadata map.
    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A conversation together with its messages, as read from a JSON document.
///
/// ```json
/// { "conversation": { "id": "c1", "createdAt": 0, "updatedAt": 0 },
///   "messages": [ { "id": "m1", "conversationId": "c1", "role": "user",
///                   "content": "What is React?", "createdAt": 0 } ] }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationInput {
    /// Conversation header
    pub conversation: Conversation,
    /// Messages in caller order
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl ConversationInput {
    /// Parse an input document from JSON text.
    pub fn from_json(text: &str) -> Result<Self, FlowError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Check structural validity.
    ///
    /// The conversation id must be non-blank and every message must carry a
    /// non-blank id. Messages may arrive in any order.
    pub fn validate(&self) -> Result<(), FlowError> {
        if self.conversation.id.trim().is_empty() {
            return Err(FlowError::InvalidInput(
                "conversation id must not be blank".to_string(),
            ));
        }
        if let Some(pos) = self.messages.iter().position(|m| m.id.trim().is_empty()) {
            return Err(FlowError::InvalidInput(format!(
                "message at index {pos} has a blank id"
            )));
        }
        Ok(())
    }
}
