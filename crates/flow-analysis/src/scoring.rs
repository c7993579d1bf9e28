//! Depth, coherence and progression scores.
//!
//! Each score combines independent weighted factors. A factor that fails or
//! yields a non-finite value is left out; when every factor of a score is
//! left out the score takes its neutral default.
//!
//! ## Combination
//!
//! ```text
//! score = (sum / active) * (active / total_factors)
//! ```
//!
//! | score       | factors (cap)                                                  | neutral |
//! |-------------|----------------------------------------------------------------|---------|
//! | depth       | length (25), vocabulary (25), topic depth (30), questions (20) | 0       |
//! | coherence   | confidence (40), natural share (35), gap regularity (25)       | 50      |
//! | progression | weight trend (50), returns (25), evolution (25)                | 50      |

use std::collections::{HashMap, HashSet};

use flow_types::Message;
use tracing::{debug, warn};

use crate::error::AnalysisError;
use crate::tokenizer::split_words;
use crate::types::{Topic, TopicTransition, TransitionType};

/// Depth when nothing can be measured.
pub const DEPTH_NEUTRAL: f64 = 0.0;

/// Coherence when nothing can be measured.
pub const COHERENCE_NEUTRAL: f64 = 50.0;

/// Progression when nothing can be measured.
pub const PROGRESSION_NEUTRAL: f64 = 50.0;

/// Largest weight drop (as a fraction) that still earns half credit.
const TOLERATED_WEIGHT_DECLINE: f64 = 0.2;

type Factor = (&'static str, Result<f64, AnalysisError>);

/// Conversation depth (0-100).
pub fn depth_score(messages: &[Message], topics: &[Topic]) -> f64 {
    if messages.is_empty() {
        return DEPTH_NEUTRAL;
    }
    combine(
        "depth",
        vec![
            ("message_length", message_length_factor(messages)),
            ("vocabulary", vocabulary_factor(messages)),
            ("topic_depth", topic_depth_factor(topics)),
            ("question_complexity", question_complexity_factor(messages)),
        ],
        DEPTH_NEUTRAL,
    )
}

/// Conversation coherence (0-100).
pub fn coherence_score(topics: &[Topic], transitions: &[TopicTransition]) -> f64 {
    if topics.len() <= 1 || transitions.is_empty() {
        return COHERENCE_NEUTRAL;
    }
    combine(
        "coherence",
        vec![
            ("transition_confidence", transition_confidence_factor(transitions)),
            ("natural_share", natural_share_factor(transitions)),
            ("gap_regularity", gap_regularity_factor(transitions)),
        ],
        COHERENCE_NEUTRAL,
    )
}

/// Conversation progression (0-100).
pub fn progression_score(topics: &[Topic], transitions: &[TopicTransition]) -> f64 {
    if topics.len() < 2 {
        return PROGRESSION_NEUTRAL;
    }
    combine(
        "progression",
        vec![
            ("weight_trend", weight_trend_factor(topics)),
            ("returns", return_factor(transitions)),
            ("evolution", evolution_factor(topics)),
        ],
        PROGRESSION_NEUTRAL,
    )
}

fn combine(score: &'static str, factors: Vec<Factor>, neutral: f64) -> f64 {
    let total = factors.len();
    let mut sum = 0.0;
    let mut active = 0usize;

    for (factor, outcome) in factors {
        match outcome {
            Ok(value) if value.is_finite() => {
                sum += value;
                active += 1;
            }
            Ok(value) => warn!(score, factor, value, "Excluding non-finite factor"),
            Err(AnalysisError::InsufficientData(reason)) => {
                debug!(score, factor, reason, "Factor not applicable")
            }
            Err(e) => warn!(score, factor, error = %e, "Excluding failed factor"),
        }
    }

    if active == 0 {
        return neutral;
    }
    let value = (sum / active as f64) * (active as f64 / total as f64);
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        neutral
    }
}

fn message_length_factor(messages: &[Message]) -> Result<f64, AnalysisError> {
    if messages.is_empty() {
        return Err(AnalysisError::InsufficientData("no messages"));
    }
    let total: usize = messages.iter().map(|m| m.content.chars().count()).sum();
    let average = total as f64 / messages.len() as f64;
    Ok((average / 20.0).min(25.0))
}

fn vocabulary_factor(messages: &[Message]) -> Result<f64, AnalysisError> {
    let words: Vec<String> = messages.iter().flat_map(|m| split_words(&m.content)).collect();
    if words.is_empty() {
        return Err(AnalysisError::InsufficientData("no words"));
    }
    let unique: HashSet<&String> = words.iter().collect();
    let richness = unique.len() as f64 / (words.len() as f64 + 1.0).ln();
    Ok((richness * 2.5).min(25.0))
}

fn topic_depth_factor(topics: &[Topic]) -> Result<f64, AnalysisError> {
    if topics.is_empty() {
        return Err(AnalysisError::InsufficientData("no topics"));
    }
    let n = topics.len() as f64;
    let avg_weight = topics.iter().map(|t| t.weight).sum::<f64>() / n;
    let avg_confidence = topics.iter().map(|t| t.confidence).sum::<f64>() / n;
    Ok((avg_weight * 10.0 + avg_confidence * 20.0).min(30.0))
}

fn question_complexity_factor(messages: &[Message]) -> Result<f64, AnalysisError> {
    let complexities: Vec<f64> = messages
        .iter()
        .filter(|m| m.is_user() && m.is_question())
        .map(|m| (split_words(&m.content).len() as f64 / 3.0).min(10.0))
        .collect();
    if complexities.is_empty() {
        return Err(AnalysisError::InsufficientData("no user questions"));
    }
    let average = complexities.iter().sum::<f64>() / complexities.len() as f64;
    Ok((average * 2.0).min(20.0))
}

fn transition_confidence_factor(transitions: &[TopicTransition]) -> Result<f64, AnalysisError> {
    if transitions.is_empty() {
        return Err(AnalysisError::InsufficientData("no transitions"));
    }
    let average =
        transitions.iter().map(|t| t.confidence).sum::<f64>() / transitions.len() as f64;
    Ok(average * 40.0)
}

fn natural_share_factor(transitions: &[TopicTransition]) -> Result<f64, AnalysisError> {
    if transitions.is_empty() {
        return Err(AnalysisError::InsufficientData("no transitions"));
    }
    let natural = transitions
        .iter()
        .filter(|t| t.transition_type == TransitionType::Natural)
        .count();
    Ok(natural as f64 / transitions.len() as f64 * 35.0)
}

/// Rewards evenly spaced topic changes: `25 / (1 + cv)` of the time gaps.
fn gap_regularity_factor(transitions: &[TopicTransition]) -> Result<f64, AnalysisError> {
    let gaps: Vec<f64> = transitions
        .iter()
        .map(|t| t.time_gap as f64)
        .filter(|g| g.is_finite() && *g >= 0.0)
        .collect();
    if gaps.len() < 2 {
        return Err(AnalysisError::InsufficientData("fewer than two gaps"));
    }
    let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
    if mean == 0.0 {
        return Err(AnalysisError::InsufficientData("all gaps are zero"));
    }
    let variance = gaps.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / gaps.len() as f64;
    let cv = variance.sqrt() / mean;
    Ok(25.0 / (1.0 + cv))
}

fn weight_trend_factor(topics: &[Topic]) -> Result<f64, AnalysisError> {
    let mut ordered: Vec<&Topic> = topics.iter().collect();
    ordered.sort_by_key(|t| t.timestamp);
    let steps = ordered.len().saturating_sub(1);
    if steps == 0 {
        return Err(AnalysisError::InsufficientData("fewer than two topics"));
    }

    let credit: f64 = ordered
        .windows(2)
        .map(|pair| {
            let (prev, next) = (pair[0].weight, pair[1].weight);
            if next >= prev {
                1.0
            } else if prev > 0.0 && (prev - next) / prev <= TOLERATED_WEIGHT_DECLINE {
                0.5
            } else {
                0.0
            }
        })
        .sum();
    Ok((credit / steps as f64 * 50.0).min(50.0))
}

fn return_factor(transitions: &[TopicTransition]) -> Result<f64, AnalysisError> {
    let returns = transitions
        .iter()
        .filter(|t| t.transition_type == TransitionType::Return)
        .count();
    Ok((returns as f64 * 5.0).min(25.0))
}

/// Topics sharing their first two words form a thread; confidence rising
/// along a thread counts as the idea evolving.
fn evolution_factor(topics: &[Topic]) -> Result<f64, AnalysisError> {
    let mut threads: HashMap<String, Vec<&Topic>> = HashMap::new();
    for topic in topics {
        let key = topic.words().take(2).collect::<Vec<_>>().join(" ");
        threads.entry(key).or_default().push(topic);
    }

    let mut steps = 0usize;
    let mut improvements = 0usize;
    for thread in threads.values_mut().filter(|t| t.len() > 1) {
        thread.sort_by_key(|t| t.timestamp);
        steps += thread.len() - 1;
        improvements += thread
            .windows(2)
            .filter(|pair| pair[1].confidence > pair[0].confidence)
            .count();
    }

    if steps == 0 {
        return Ok(0.0);
    }
    Ok((improvements as f64 / steps as f64 * 25.0).min(25.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use flow_types::MessageRole;

    fn message(role: MessageRole, content: &str, ts_ms: i64) -> Message {
        Message::new("conv-1", role, content, Utc.timestamp_millis_opt(ts_ms).unwrap())
    }

    fn topic(content: &str, ts: i64, confidence: f64, weight: f64) -> Topic {
        Topic::new(content, &format!("m{ts}"), ts, confidence, weight)
    }

    fn transition(kind: TransitionType, confidence: f64, gap: i64) -> TopicTransition {
        TopicTransition {
            from_topic: "a".to_string(),
            to_topic: "b".to_string(),
            timestamp: 0,
            transition_type: kind,
            confidence,
            time_gap: gap,
        }
    }

    #[test]
    fn test_combine_scales_by_total_factors() {
        let value = combine(
            "test",
            vec![("a", Ok(20.0)), ("b", Ok(10.0)), ("c", Ok(30.0))],
            50.0,
        );
        assert!((value - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_combine_excludes_failed_and_non_finite_factors() {
        let value = combine(
            "test",
            vec![
                ("a", Ok(40.0)),
                ("b", Ok(f64::NAN)),
                ("c", Err(AnalysisError::NonFinite("c"))),
                ("d", Ok(20.0)),
            ],
            0.0,
        );
        // (60 / 2) * (2 / 4)
        assert!((value - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_combine_all_failed_returns_neutral() {
        let value = combine(
            "test",
            vec![
                ("a", Err(AnalysisError::InsufficientData("none"))),
                ("b", Ok(f64::INFINITY)),
            ],
            50.0,
        );
        assert!((value - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_depth_empty_messages() {
        assert!(depth_score(&[], &[]).abs() < f64::EPSILON);
    }

    #[test]
    fn test_depth_factors() {
        let messages = vec![
            message(MessageRole::User, "What is React?", 0),
            message(
                MessageRole::Assistant,
                "React is a JavaScript library for building user interfaces.",
                1_000,
            ),
        ];
        let topics = vec![topic("is react", 0, 0.8, 1.5)];

        // (14 + 59) / 2 / 20
        assert!((message_length_factor(&messages).unwrap() - 1.825).abs() < 1e-9);
        // 10 unique of 12 words
        let vocab = 10.0 / 13.0_f64.ln() * 2.5;
        assert!((vocabulary_factor(&messages).unwrap() - vocab).abs() < 1e-9);
        // 1.5 * 10 + 0.8 * 20 = 31, capped
        assert!((topic_depth_factor(&topics).unwrap() - 30.0).abs() < 1e-9);
        // 3 words / 3 = 1, doubled
        assert!((question_complexity_factor(&messages).unwrap() - 2.0).abs() < 1e-9);

        let expected = (1.825 + vocab + 30.0 + 2.0) / 4.0;
        assert!((depth_score(&messages, &topics) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_depth_without_topics_or_questions() {
        let messages = vec![message(MessageRole::Assistant, "Plain statement here", 0)];
        let depth = depth_score(&messages, &[]);
        assert!(depth > 0.0);
        assert!(depth <= 100.0);
    }

    #[test]
    fn test_message_length_is_capped() {
        let long = "x".repeat(2_000);
        let messages = vec![message(MessageRole::User, &long, 0)];
        assert!((message_length_factor(&messages).unwrap() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_coherence_neutral_cases() {
        let one = vec![topic("react hooks", 0, 0.8, 1.0)];
        assert!((coherence_score(&one, &[]) - 50.0).abs() < f64::EPSILON);

        let two = vec![topic("react hooks", 0, 0.8, 1.0), topic("graph cycles", 1, 0.8, 1.0)];
        assert!((coherence_score(&two, &[]) - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_coherence_factors() {
        let topics = vec![
            topic("react hooks", 0, 0.8, 1.0),
            topic("react hooks state", 60_000, 0.8, 1.0),
            topic("graph cycles", 120_000, 0.8, 1.0),
        ];
        let transitions = vec![
            transition(TransitionType::Natural, 0.5, 60_000),
            transition(TransitionType::Tangent, 0.7, 60_000),
        ];
        // 0.6 * 40 + 0.5 * 35 + 25 / (1 + 0)
        let expected = (24.0 + 17.5 + 25.0) / 3.0;
        assert!((coherence_score(&topics, &transitions) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_gap_regularity_needs_two_nonzero_gaps() {
        assert!(gap_regularity_factor(&[transition(TransitionType::Abrupt, 0.5, 10)]).is_err());
        assert!(gap_regularity_factor(&[
            transition(TransitionType::Abrupt, 0.5, 0),
            transition(TransitionType::Abrupt, 0.5, 0),
        ])
        .is_err());

        let irregular = gap_regularity_factor(&[
            transition(TransitionType::Tangent, 0.5, 1_000),
            transition(TransitionType::Tangent, 0.5, 99_000),
        ])
        .unwrap();
        assert!(irregular < 25.0);
        assert!(irregular > 0.0);
    }

    #[test]
    fn test_progression_neutral_with_one_topic() {
        let one = vec![topic("react hooks", 0, 0.8, 1.0)];
        assert!((progression_score(&one, &[]) - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_weight_trend_credit() {
        let rising = vec![
            topic("alpha topic", 0, 0.8, 1.0),
            topic("beta topic", 1, 0.8, 2.0),
            topic("gamma topic", 2, 0.8, 3.0),
        ];
        assert!((weight_trend_factor(&rising).unwrap() - 50.0).abs() < 1e-9);

        // one full step, one small decline (10%), one large decline (50%)
        let mixed = vec![
            topic("alpha topic", 0, 0.8, 1.0),
            topic("beta topic", 1, 0.8, 2.0),
            topic("gamma topic", 2, 0.8, 1.8),
            topic("delta topic", 3, 0.8, 0.9),
        ];
        let expected = 1.5 / 3.0 * 50.0;
        assert!((weight_trend_factor(&mixed).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_return_factor_capped() {
        let returns: Vec<TopicTransition> = (0..7)
            .map(|_| transition(TransitionType::Return, 0.5, 0))
            .collect();
        assert!((return_factor(&returns[..2]).unwrap() - 10.0).abs() < f64::EPSILON);
        assert!((return_factor(&returns).unwrap() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_evolution_factor() {
        let topics = vec![
            topic("react hooks state", 0, 0.6, 1.0),
            topic("react hooks effect", 10, 0.7, 1.0),
            topic("react hooks memo", 20, 0.65, 1.0),
            topic("graph cycles", 30, 0.9, 1.0),
        ];
        // thread "react hooks": 2 steps, 1 improvement
        assert!((evolution_factor(&topics).unwrap() - 12.5).abs() < 1e-9);

        let distinct = vec![topic("alpha one", 0, 0.5, 1.0), topic("beta two", 1, 0.9, 1.0)];
        assert!(evolution_factor(&distinct).unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn test_progression_combines_factors() {
        let topics = vec![
            topic("alpha topic", 0, 0.8, 1.0),
            topic("beta topic", 1, 0.8, 2.0),
            topic("gamma topic", 2, 0.8, 3.0),
        ];
        let transitions = vec![transition(TransitionType::Return, 0.5, 1)];
        let expected = (50.0 + 5.0 + 0.0) / 3.0;
        assert!((progression_score(&topics, &transitions) - expected).abs() < 1e-9);
    }
}
