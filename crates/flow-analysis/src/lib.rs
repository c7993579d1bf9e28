//! # flow-analysis
//!
//! Conversation flow analysis for persisted user/assistant conversations.
//!
//! Messages are reduced to topics by n-gram scoring, topics are linked in
//! time order into a transition graph, and the graph is checked for cycles
//! with Tarjan's strongly-connected-components algorithm. Depth, coherence
//! and progression scores are layered on top, and every stage falls back
//! to a neutral value instead of failing the whole analysis.
//!
//! ## Pipeline
//! 1. Tokenizer: lowercase, strip punctuation, drop stop-words
//! 2. Topic extraction: n-grams (2..=5) scored TF-IDF style, merged by content
//! 3. Transitions: consecutive topics in time order, classified and scored
//! 4. Circularity: iterative Tarjan SCC over the transition graph
//! 5. Scoring: depth, coherence, progression
//! 6. Aggregation: clamped `ConversationFlowMetrics`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use flow_analysis::ConversationFlowAnalyzer;
//!
//! let analyzer = ConversationFlowAnalyzer::default();
//! let metrics = analyzer.analyze_flow(&conversation, &messages).await?;
//! println!("circularity: {:.2}", metrics.circularity_index);
//! ```

pub mod analyzer;
pub mod circularity;
pub mod config;
pub mod error;
pub mod extraction;
pub mod metrics;
pub mod scoring;
pub mod tokenizer;
pub mod transitions;
pub mod types;

pub use analyzer::ConversationFlowAnalyzer;
pub use circularity::{analyze_circularity, try_analyze_circularity, CircularityAnalysis, TopicGraph};
pub use config::{AnalyzerConfig, EmptyConversationPolicy, ExtractionConfig, TransitionConfig};
pub use error::AnalysisError;
pub use extraction::TopicExtractor;
pub use metrics::{ConversationFlowMetrics, FlowParts};
pub use scoring::{coherence_score, depth_score, progression_score};
pub use tokenizer::tokenize;
pub use transitions::TransitionBuilder;
pub use types::{Topic, TopicId, TopicTransition, TransitionType};
