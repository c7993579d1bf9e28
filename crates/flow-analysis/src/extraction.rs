//! Topic extraction from conversation messages.
//!
//! Every message contributes n-gram candidates scored with a simplified
//! TF-IDF formula, plus a question topic for user questions. Candidates with
//! the same normalized content are merged and low-confidence results dropped.

use std::collections::HashMap;

use flow_types::{Message, MessageRole};
use tracing::{debug, instrument, warn};

use crate::config::ExtractionConfig;
use crate::error::AnalysisError;
use crate::tokenizer::{split_words, tokenize};
use crate::types::{normalize, Topic};

/// Phrases that carry no topic on their own.
const FILLER_PHRASES: &[&str] = &["i think", "you know", "i mean", "you can", "i want"];

/// Words that open a question topic.
const QUESTION_WORDS: &[&str] = &["what", "how", "why", "when", "where", "who", "which"];

/// Extracts and merges topics from messages.
#[derive(Debug, Clone, Default)]
pub struct TopicExtractor {
    config: ExtractionConfig,
}

impl TopicExtractor {
    /// Create a new extractor.
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Extract topics, falling back to an empty list on failure.
    pub fn extract_topics(&self, messages: &[Message]) -> Vec<Topic> {
        self.try_extract_topics(messages).unwrap_or_else(|e| {
            warn!(error = %e, "Topic extraction failed, continuing without topics");
            Vec::new()
        })
    }

    /// Extract topics from messages.
    ///
    /// Returns merged topics whose confidence reaches the configured threshold,
    /// sorted by weight (highest first).
    #[instrument(skip(self, messages), fields(messages = messages.len()))]
    pub fn try_extract_topics(&self, messages: &[Message]) -> Result<Vec<Topic>, AnalysisError> {
        let candidates = self.extract_candidates(messages);
        let topics = self.merge_topics(candidates)?;
        debug!(topics = topics.len(), "Extracted topics");
        Ok(topics)
    }

    /// Produce unmerged topic candidates in message order.
    ///
    /// Messages that cannot contribute are skipped individually.
    pub fn extract_candidates(&self, messages: &[Message]) -> Vec<Topic> {
        let mut candidates = Vec::new();
        for message in messages {
            match self.message_candidates(message) {
                Ok(mut topics) => candidates.append(&mut topics),
                Err(e) => debug!(message_id = %message.id, error = %e, "Skipping message"),
            }
        }
        candidates
    }

    /// Merge candidates sharing normalized content.
    ///
    /// Each group keeps the id, text and timestamp of its first occurrence.
    /// Confidence starts from the strongest member and every other member
    /// adds `merge_confidence_boost` times its own confidence. Merged topics
    /// below the confidence
    /// threshold are dropped and the rest are sorted by descending weight;
    /// equal weights keep first-seen order.
    pub fn merge_topics(&self, candidates: Vec<Topic>) -> Result<Vec<Topic>, AnalysisError> {
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<Vec<Topic>> = Vec::new();

        for candidate in candidates {
            match positions.get(&candidate.normalized_content) {
                Some(&pos) => groups[pos].push(candidate),
                None => {
                    positions.insert(candidate.normalized_content.clone(), groups.len());
                    groups.push(vec![candidate]);
                }
            }
        }

        let boost = self.config.merge_confidence_boost;
        let merged: Vec<Topic> = groups
            .into_iter()
            .filter_map(|group| merge_group(group, boost))
            .collect();

        if merged
            .iter()
            .any(|t| !t.weight.is_finite() || !t.confidence.is_finite())
        {
            return Err(AnalysisError::NonFinite("merged topic scores"));
        }

        let mut topics: Vec<Topic> = merged
            .into_iter()
            .filter(|t| t.confidence >= self.config.confidence_threshold)
            .collect();
        topics.sort_by(|a, b| {
            b.weight
                .partial_cmp(&a.weight)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(topics)
    }

    fn message_candidates(&self, message: &Message) -> Result<Vec<Topic>, AnalysisError> {
        if message.content.trim().is_empty() {
            return Err(AnalysisError::InsufficientData("message has no content"));
        }
        let tokens = tokenize(&message.content);
        if tokens.is_empty() {
            return Err(AnalysisError::InsufficientData("message has no tokens"));
        }

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for token in &tokens {
            *counts.entry(token.as_str()).or_insert(0) += 1;
        }

        let mut topics = Vec::new();
        for n in self.config.min_ngram..=self.config.max_ngram {
            if tokens.len() < n {
                break;
            }
            topics.extend(
                tokens
                    .windows(n)
                    .filter_map(|window| ngram_topic(window, &counts, message)),
            );
        }

        if message.role == MessageRole::User && message.is_question() {
            if let Some(topic) = self.question_topic(message) {
                topics.push(topic);
            }
        }

        Ok(topics)
    }

    /// Build the topic for a user question: the words following the first
    /// question word.
    fn question_topic(&self, message: &Message) -> Option<Topic> {
        let words = split_words(&message.content);
        let start = words
            .iter()
            .position(|w| QUESTION_WORDS.contains(&w.as_str()))?;
        let tail: Vec<&str> = words[start + 1..]
            .iter()
            .take(self.config.question_words)
            .map(String::as_str)
            .collect();
        if tail.is_empty() {
            return None;
        }

        let content = tail.join(" ");
        if !is_valid_topic(&normalize(&content)) {
            return None;
        }
        Some(Topic::new(
            content,
            &message.id,
            message.timestamp_ms(),
            self.config.question_confidence,
            self.config.question_weight,
        ))
    }
}

/// Fold one group of equal-key candidates into a single topic.
///
/// Weights add up. Confidence is the peak member confidence plus `boost`
/// times the confidence of every other member, capped at 1.0.
fn merge_group(group: Vec<Topic>, boost: f64) -> Option<Topic> {
    let weight: f64 = group.iter().map(|t| t.weight).sum();
    let total: f64 = group.iter().map(|t| t.confidence).sum();
    let peak = group
        .iter()
        .map(|t| t.confidence)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut survivor = group.into_iter().next()?;
    survivor.weight = weight;
    survivor.confidence = (peak + boost * (total - peak)).min(1.0);
    Some(survivor)
}

/// Score one n-gram window of a message.
///
/// `score = n / ln(doc_freq + 1)` where `doc_freq` counts message tokens that
/// occur in the window; confidence is `score / 10` capped at 1 and weight is
/// `confidence * n`.
fn ngram_topic(
    window: &[String],
    counts: &HashMap<&str, usize>,
    message: &Message,
) -> Option<Topic> {
    let content = window.join(" ");
    if !is_valid_topic(&normalize(&content)) {
        return None;
    }

    let n = window.len() as f64;
    let mut distinct: Vec<&str> = window.iter().map(String::as_str).collect();
    distinct.sort_unstable();
    distinct.dedup();
    let doc_freq = distinct
        .iter()
        .map(|w| counts.get(w).copied().unwrap_or(0))
        .sum::<usize>() as f64;
    let score = n / (doc_freq + 1.0).ln();
    let confidence = (score / 10.0).min(1.0);
    if !confidence.is_finite() {
        return None;
    }

    Some(Topic::new(
        content,
        &message.id,
        message.timestamp_ms(),
        confidence,
        confidence * n,
    ))
}

/// Check whether normalized text can stand as a topic.
///
/// Rejects text shorter than three characters (which covers single
/// letters), text made only of digits, and filler phrases.
pub fn is_valid_topic(normalized: &str) -> bool {
    if normalized.chars().count() < 3 {
        return false;
    }
    if normalized.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    !FILLER_PHRASES.contains(&normalized)
}
