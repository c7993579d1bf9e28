//! Conversation flow analyzer.
//!
//! Runs the pipeline stages in order and assembles the metrics record.
//! Each stage is isolated: an error or panic inside one stage is logged and
//! replaced by that stage's default, and the remaining stages still run.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use flow_types::{Conversation, Message};
use tracing::{debug, instrument, warn};

use crate::circularity::{try_analyze_circularity, CircularityAnalysis};
use crate::config::{AnalyzerConfig, EmptyConversationPolicy};
use crate::error::AnalysisError;
use crate::extraction::TopicExtractor;
use crate::metrics::{ConversationFlowMetrics, FlowParts};
use crate::scoring::{
    coherence_score, depth_score, progression_score, COHERENCE_NEUTRAL, DEPTH_NEUTRAL,
    PROGRESSION_NEUTRAL,
};
use crate::transitions::TransitionBuilder;

/// Analyzes the topic flow of a conversation.
///
/// Holds only immutable configuration, so one instance can be shared across
/// tasks behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct ConversationFlowAnalyzer {
    config: AnalyzerConfig,
    extractor: TopicExtractor,
    builder: TransitionBuilder,
}

impl ConversationFlowAnalyzer {
    /// Create an analyzer after validating the configuration.
    pub fn new(config: AnalyzerConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self {
            extractor: TopicExtractor::new(config.extraction.clone()),
            builder: TransitionBuilder::new(config.transitions.clone()),
            config,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Get the topic extractor.
    pub fn extractor(&self) -> &TopicExtractor {
        &self.extractor
    }

    /// Analyze one conversation.
    ///
    /// Returns an error only for invalid input: a blank conversation id, or
    /// no messages under [`EmptyConversationPolicy::Reject`]. If assembling
    /// the record fails, a zeroed record with `error` set is returned.
    #[instrument(
        skip(self, conversation, messages),
        fields(conversation_id = %conversation.id, messages = messages.len())
    )]
    pub async fn analyze_flow(
        &self,
        conversation: &Conversation,
        messages: &[Message],
    ) -> Result<ConversationFlowMetrics, AnalysisError> {
        if conversation.id.trim().is_empty() {
            return Err(AnalysisError::InvalidInput(
                "conversation id is blank".to_string(),
            ));
        }

        if messages.is_empty() {
            return match self.config.empty_conversation {
                EmptyConversationPolicy::DefaultMetrics => {
                    debug!("No messages, returning empty metrics");
                    Ok(ConversationFlowMetrics::empty(&conversation.id))
                }
                EmptyConversationPolicy::Reject => Err(AnalysisError::EmptyConversation(
                    conversation.id.clone(),
                )),
            };
        }

        let metrics = assemble_or_fallback(&conversation.id, || {
            self.run_pipeline(&conversation.id, messages)
        });

        debug!(
            topics = metrics.topic_count,
            transitions = metrics.transition_count,
            circularity = metrics.circularity_index,
            "Analyzed conversation flow"
        );
        Ok(metrics)
    }

    fn run_pipeline(&self, conversation_id: &str, messages: &[Message]) -> ConversationFlowMetrics {
        let topics = substitute(
            "topic extraction",
            guarded("topic extraction", || {
                self.extractor.try_extract_topics(messages)
            }),
            Vec::new(),
        );

        let transitions = substitute(
            "transitions",
            guarded("transitions", || Ok(self.builder.build_transitions(&topics))),
            Vec::new(),
        );

        let circularity = substitute(
            "circularity",
            guarded("circularity", || {
                try_analyze_circularity(&topics, &transitions)
            }),
            CircularityAnalysis::default(),
        );

        let depth = substitute(
            "depth",
            guarded("depth", || Ok(depth_score(messages, &topics))),
            DEPTH_NEUTRAL,
        );
        let coherence = substitute(
            "coherence",
            guarded("coherence", || Ok(coherence_score(&topics, &transitions))),
            COHERENCE_NEUTRAL,
        );
        let progression = substitute(
            "progression",
            guarded("progression", || Ok(progression_score(&topics, &transitions))),
            PROGRESSION_NEUTRAL,
        );

        ConversationFlowMetrics::assemble(
            conversation_id,
            messages,
            FlowParts {
                topics,
                transitions,
                circularity,
                depth,
                coherence,
                progression,
            },
        )
    }
}

/// Run the whole pipeline, replacing a failed run with an error record.
fn assemble_or_fallback(
    conversation_id: &str,
    run: impl FnOnce() -> ConversationFlowMetrics,
) -> ConversationFlowMetrics {
    match guarded("assembly", || Ok(run())) {
        Ok(metrics) => metrics,
        Err(e) => {
            warn!(error = %e, "Flow analysis failed, returning fallback metrics");
            ConversationFlowMetrics::failed(conversation_id, e.to_string())
        }
    }
}

/// Run a stage, turning a panic into [`AnalysisError::Stage`].
fn guarded<T>(
    stage: &'static str,
    run: impl FnOnce() -> Result<T, AnalysisError>,
) -> Result<T, AnalysisError> {
    panic::catch_unwind(AssertUnwindSafe(run)).unwrap_or_else(|payload| {
        Err(AnalysisError::Stage {
            stage,
            reason: panic_reason(payload.as_ref()),
        })
    })
}

/// Keep a stage's value, or log the failure and use its default.
fn substitute<T>(stage: &'static str, result: Result<T, AnalysisError>, default: T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(stage, error = %e, "Stage failed, using default");
            default
        }
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
