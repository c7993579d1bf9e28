//! Topic transition building.
//!
//! Topics are ordered by time and every adjacent pair becomes one directed
//! transition, classified by timing and word overlap.
//!
//! ## Classification (first match wins)
//!
//! - **Return**: the source topic is newer than the target
//! - **Abrupt**: the gap is below `abrupt_gap_ms`
//! - **Natural**: word overlap above `natural_similarity`
//! - **Tangent**: everything else

use std::collections::HashSet;

use tracing::{debug, instrument, warn};

use crate::config::TransitionConfig;
use crate::error::AnalysisError;
use crate::types::{Topic, TopicTransition, TransitionType};

/// Share of transition confidence from word overlap.
const SIMILARITY_WEIGHT: f64 = 0.4;

/// Share of transition confidence from temporal proximity.
const PROXIMITY_WEIGHT: f64 = 0.3;

/// Share of transition confidence from the endpoints' own confidence.
const ENDPOINT_WEIGHT: f64 = 0.3;

/// Builds transitions between temporally adjacent topics.
#[derive(Debug, Clone, Default)]
pub struct TransitionBuilder {
    config: TransitionConfig,
}

impl TransitionBuilder {
    /// Create a new transition builder.
    pub fn new(config: TransitionConfig) -> Self {
        Self { config }
    }

    /// Build one transition per adjacent pair of time-sorted topics.
    ///
    /// Fewer than two topics yield no transitions. A pair whose scores cannot
    /// be computed is skipped.
    #[instrument(skip(self, topics), fields(topics = topics.len()))]
    pub fn build_transitions(&self, topics: &[Topic]) -> Vec<TopicTransition> {
        if topics.len() < 2 {
            return Vec::new();
        }

        let mut ordered: Vec<&Topic> = topics.iter().collect();
        ordered.sort_by_key(|t| t.timestamp);

        let transitions: Vec<TopicTransition> = ordered
            .windows(2)
            .filter_map(|pair| match self.transition_between(pair[0], pair[1]) {
                Ok(transition) => Some(transition),
                Err(e) => {
                    warn!(
                        from = %pair[0].id,
                        to = %pair[1].id,
                        error = %e,
                        "Skipping transition"
                    );
                    None
                }
            })
            .collect();

        debug!(transitions = transitions.len(), "Built transitions");
        transitions
    }

    fn transition_between(
        &self,
        from: &Topic,
        to: &Topic,
    ) -> Result<TopicTransition, AnalysisError> {
        let time_gap = to.timestamp.saturating_sub(from.timestamp).max(0);
        let similarity = word_similarity(from, to);
        let transition_type = self.classify(from, to, time_gap, similarity);

        let proximity = (-(time_gap as f64) / self.config.gap_decay_ms).exp();
        let confidence = similarity * SIMILARITY_WEIGHT
            + proximity * PROXIMITY_WEIGHT
            + (from.confidence * to.confidence) * ENDPOINT_WEIGHT;
        if !confidence.is_finite() {
            return Err(AnalysisError::NonFinite("transition confidence"));
        }

        Ok(TopicTransition {
            from_topic: from.id.clone(),
            to_topic: to.id.clone(),
            timestamp: to.timestamp,
            transition_type,
            confidence: confidence.clamp(0.0, 1.0),
            time_gap,
        })
    }

    fn classify(&self, from: &Topic, to: &Topic, time_gap: i64, similarity: f64) -> TransitionType {
        // Topics arrive sorted, so this only fires for inputs that bypass the sort.
        if from.timestamp > to.timestamp {
            TransitionType::Return
        } else if time_gap < self.config.abrupt_gap_ms {
            TransitionType::Abrupt
        } else if similarity > self.config.natural_similarity {
            TransitionType::Natural
        } else {
            TransitionType::Tangent
        }
    }
}

/// Jaccard similarity of the two topics' word sets.
pub fn word_similarity(a: &Topic, b: &Topic) -> f64 {
    let words_a: HashSet<&str> = a.words().collect();
    let words_b: HashSet<&str> = b.words().collect();
    let union = words_a.union(&words_b).count();
    if union == 0 {
        return 0.0;
    }
    words_a.intersection(&words_b).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(content: &str, message_id: &str, ts: i64, confidence: f64) -> Topic {
        Topic::new(content, message_id, ts, confidence, 1.0)
    }

    #[test]
    fn test_fewer_than_two_topics() {
        let builder = TransitionBuilder::default();
        assert!(builder.build_transitions(&[]).is_empty());
        assert!(builder
            .build_transitions(&[topic("react hooks", "m1", 0, 0.8)])
            .is_empty());
    }

    #[test]
    fn test_one_transition_per_adjacent_pair() {
        let builder = TransitionBuilder::default();
        let topics = vec![
            topic("graph theory", "m1", 0, 0.8),
            topic("react hooks", "m2", 60_000, 0.8),
            topic("state management", "m3", 120_000, 0.8),
            topic("tarjan lowlink", "m4", 180_000, 0.8),
        ];
        let transitions = builder.build_transitions(&topics);
        assert_eq!(transitions.len(), topics.len() - 1);
    }

    #[test]
    fn test_sorts_by_timestamp() {
        let builder = TransitionBuilder::default();
        let late = topic("react hooks", "m2", 90_000, 0.8);
        let early = topic("graph theory", "m1", 0, 0.8);
        let transitions = builder.build_transitions(&[late.clone(), early.clone()]);

        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].from_topic, early.id);
        assert_eq!(transitions[0].to_topic, late.id);
        assert_eq!(transitions[0].time_gap, 90_000);
        assert_eq!(transitions[0].timestamp, 90_000);
    }

    #[test]
    fn test_abrupt_when_gap_is_short() {
        let builder = TransitionBuilder::default();
        let transitions = builder.build_transitions(&[
            topic("react hooks", "m1", 0, 0.8),
            topic("react hooks usage", "m2", 5_000, 0.8),
        ]);
        assert_eq!(transitions[0].transition_type, TransitionType::Abrupt);
    }

    #[test]
    fn test_natural_when_words_overlap() {
        let builder = TransitionBuilder::default();
        let transitions = builder.build_transitions(&[
            topic("react hooks state", "m1", 0, 0.8),
            topic("react hooks effect", "m2", 60_000, 0.8),
            topic("compiler backend", "m3", 120_000, 0.8),
        ]);
        // {react, hooks, state} vs {react, hooks, effect}: 2 / 4 = 0.5, not above the bar
        assert_eq!(transitions[0].transition_type, TransitionType::Tangent);
        assert_eq!(transitions[1].transition_type, TransitionType::Tangent);

        let transitions = builder.build_transitions(&[
            topic("react hooks state", "m1", 0, 0.8),
            topic("react hooks state usage", "m2", 60_000, 0.8),
        ]);
        // 3 / 4 = 0.75
        assert_eq!(transitions[0].transition_type, TransitionType::Natural);
    }

    #[test]
    fn test_return_is_unreachable_after_sorting() {
        let builder = TransitionBuilder::default();
        let topics = vec![
            topic("react hooks", "m3", 300_000, 0.8),
            topic("graph theory", "m1", 0, 0.8),
            topic("react hooks state", "m2", 100_000, 0.8),
        ];
        let transitions = builder.build_transitions(&topics);
        assert!(transitions
            .iter()
            .all(|t| t.transition_type != TransitionType::Return));
    }

    #[test]
    fn test_classify_return_for_out_of_order_pair() {
        let builder = TransitionBuilder::default();
        let newer = topic("react hooks", "m2", 50_000, 0.8);
        let older = topic("react hooks", "m1", 0, 0.8);
        assert_eq!(
            builder.classify(&newer, &older, 0, 1.0),
            TransitionType::Return
        );
    }

    #[test]
    fn test_confidence_formula() {
        let builder = TransitionBuilder::default();
        let transitions = builder.build_transitions(&[
            topic("react hooks", "m1", 0, 0.8),
            topic("graph theory", "m2", 300_000, 0.5),
        ]);
        // similarity 0, proximity e^-1, endpoints 0.4
        let expected = (-1.0_f64).exp() * 0.3 + 0.4 * 0.3;
        assert!((transitions[0].confidence - expected).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let builder = TransitionBuilder::default();
        let transitions = builder.build_transitions(&[
            topic("react hooks", "m1", 0, 1.0),
            topic("react hooks", "m2", 0, 1.0),
        ]);
        assert!((transitions[0].confidence - 1.0).abs() < 1e-9);
        assert_eq!(transitions[0].time_gap, 0);
    }

    #[test]
    fn test_word_similarity() {
        let a = topic("react hooks state", "m1", 0, 0.5);
        let b = topic("react hooks", "m2", 0, 0.5);
        let c = topic("graph theory", "m3", 0, 0.5);
        assert!((word_similarity(&a, &b) - 2.0 / 3.0).abs() < 1e-9);
        assert!(word_similarity(&a, &c).abs() < f64::EPSILON);
        assert!((word_similarity(&a, &a) - 1.0).abs() < f64::EPSILON);
    }
}
