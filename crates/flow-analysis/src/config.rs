//! Analyzer configuration.

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Master configuration for flow analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// What to do with a conversation that has no messages
    #[serde(default)]
    pub empty_conversation: EmptyConversationPolicy,

    /// Topic extraction settings
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Transition classification settings
    #[serde(default)]
    pub transitions: TransitionConfig,
}

impl AnalyzerConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        self.extraction.validate()?;
        self.transitions.validate()
    }
}

/// Behavior of `analyze_flow` when the message list is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyConversationPolicy {
    /// Return a zeroed metrics record
    #[default]
    DefaultMetrics,
    /// Return `AnalysisError::EmptyConversation`
    Reject,
}

/// Topic extraction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Shortest n-gram window
    #[serde(default = "default_min_ngram")]
    pub min_ngram: usize,

    /// Longest n-gram window
    #[serde(default = "default_max_ngram")]
    pub max_ngram: usize,

    /// Merged topics below this confidence are dropped
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Fraction of an incoming duplicate's confidence added on merge
    #[serde(default = "default_merge_confidence_boost")]
    pub merge_confidence_boost: f64,

    /// Fixed confidence of question topics
    #[serde(default = "default_question_confidence")]
    pub question_confidence: f64,

    /// Fixed weight of question topics
    #[serde(default = "default_question_weight")]
    pub question_weight: f64,

    /// Words taken after the question word
    #[serde(default = "default_question_words")]
    pub question_words: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_ngram: default_min_ngram(),
            max_ngram: default_max_ngram(),
            confidence_threshold: default_confidence_threshold(),
            merge_confidence_boost: default_merge_confidence_boost(),
            question_confidence: default_question_confidence(),
            question_weight: default_question_weight(),
            question_words: default_question_words(),
        }
    }
}

impl ExtractionConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.min_ngram == 0 || self.min_ngram > self.max_ngram {
            return Err(AnalysisError::InvalidConfig(format!(
                "n-gram range must satisfy 1 <= min <= max, got {}..={}",
                self.min_ngram, self.max_ngram
            )));
        }
        for (name, value) in [
            ("confidence_threshold", self.confidence_threshold),
            ("merge_confidence_boost", self.merge_confidence_boost),
            ("question_confidence", self.question_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "{name} must be 0.0-1.0, got {value}"
                )));
            }
        }
        if !self.question_weight.is_finite() || self.question_weight < 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "question_weight must be a finite value >= 0, got {}",
                self.question_weight
            )));
        }
        Ok(())
    }
}

fn default_min_ngram() -> usize {
    2
}
fn default_max_ngram() -> usize {
    5
}
fn default_confidence_threshold() -> f64 {
    0.6
}
fn default_merge_confidence_boost() -> f64 {
    0.1
}
fn default_question_confidence() -> f64 {
    0.8
}
fn default_question_weight() -> f64 {
    1.5
}
fn default_question_words() -> usize {
    3
}

/// Transition classification configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionConfig {
    /// Gaps shorter than this are abrupt (ms)
    #[serde(default = "default_abrupt_gap_ms")]
    pub abrupt_gap_ms: i64,

    /// Word overlap above this is a natural transition
    #[serde(default = "default_natural_similarity")]
    pub natural_similarity: f64,

    /// Time constant of the gap term in transition confidence (ms)
    #[serde(default = "default_gap_decay_ms")]
    pub gap_decay_ms: f64,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            abrupt_gap_ms: default_abrupt_gap_ms(),
            natural_similarity: default_natural_similarity(),
            gap_decay_ms: default_gap_decay_ms(),
        }
    }
}

impl TransitionConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.abrupt_gap_ms < 0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "abrupt_gap_ms must be >= 0, got {}",
                self.abrupt_gap_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.natural_similarity) {
            return Err(AnalysisError::InvalidConfig(format!(
                "natural_similarity must be 0.0-1.0, got {}",
                self.natural_similarity
            )));
        }
        if !self.gap_decay_ms.is_finite() || self.gap_decay_ms <= 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "gap_decay_ms must be > 0, got {}",
                self.gap_decay_ms
            )));
        }
        Ok(())
    }
}

fn default_abrupt_gap_ms() -> i64 {
    10_000
}
fn default_natural_similarity() -> f64 {
    0.5
}
fn default_gap_decay_ms() -> f64 {
    300_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AnalyzerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.empty_conversation,
            EmptyConversationPolicy::DefaultMetrics
        );
    }

    #[test]
    fn test_extraction_defaults() {
        let config = ExtractionConfig::default();
        assert_eq!(config.min_ngram, 2);
        assert_eq!(config.max_ngram, 5);
        assert!((config.confidence_threshold - 0.6).abs() < f64::EPSILON);
        assert!((config.question_confidence - 0.8).abs() < f64::EPSILON);
        assert!((config.question_weight - 1.5).abs() < f64::EPSILON);
        assert_eq!(config.question_words, 3);
    }

    #[test]
    fn test_transition_defaults() {
        let config = TransitionConfig::default();
        assert_eq!(config.abrupt_gap_ms, 10_000);
        assert!((config.natural_similarity - 0.5).abs() < f64::EPSILON);
        assert!((config.gap_decay_ms - 300_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_extraction_validation() {
        let mut config = ExtractionConfig::default();
        config.min_ngram = 6;
        assert!(config.validate().is_err());

        config.min_ngram = 0;
        assert!(config.validate().is_err());

        config = ExtractionConfig::default();
        config.confidence_threshold = 1.5;
        assert!(config.validate().is_err());

        config = ExtractionConfig::default();
        config.question_weight = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_transition_validation() {
        let mut config = TransitionConfig::default();
        config.gap_decay_ms = 0.0;
        assert!(config.validate().is_err());

        config = TransitionConfig::default();
        config.abrupt_gap_ms = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{"extraction": {"max_ngram": 3}, "empty_conversation": "reject"}"#;
        let config: AnalyzerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.extraction.max_ngram, 3);
        assert_eq!(config.extraction.min_ngram, 2);
        assert_eq!(config.empty_conversation, EmptyConversationPolicy::Reject);
        assert_eq!(config.transitions, TransitionConfig::default());
    }
}
