//! # flow-types
//!
//! Shared input records for conversation flow analysis.
//!
//! These are the records handed to the analysis engine by its caller:
//! - Messages: Immutable user/assistant/system turns
//! - Conversations: Header data for a message sequence
//! - Conversation inputs: A conversation bundled with its messages
//!
//! ## Usage
//!
//! ```rust
//! use flow_types::{Message, MessageRole};
//! use chrono::Utc;
//!
//! let msg = Message::new("conv-1", MessageRole::User, "What is React?", Utc::now());
//! assert!(msg.is_question());
//! ```

pub mod conversation;
pub mod error;
pub mod message;

pub use conversation::{Conversation, ConversationInput};
pub use error::FlowError;
pub use message::{Message, MessageRole};
