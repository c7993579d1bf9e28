//! Text tokenization for topic extraction.
//!
//! Two views of a message are used downstream: filtered tokens (for n-gram
//! topics) and plain words (for vocabulary, question and overlap measures).

/// Function words that never start or end a topic.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "have", "this", "that", "with", "they", "from", "will", "would",
    "there", "their", "what", "when", "where", "which", "who", "how", "why", "been", "were",
    "into", "than", "then", "them", "these", "those", "about", "just", "also", "your",
];

/// Tokenize text into lowercase content tokens.
///
/// Filters out:
/// - Punctuation (replaced by whitespace)
/// - Tokens of two characters or fewer
/// - Stop words
pub fn tokenize(text: &str) -> Vec<String> {
    strip_punctuation(&text.to_lowercase())
        .split_whitespace()
        .filter(|s| s.chars().count() > 2)
        .filter(|s| !is_stop_word(s))
        .map(String::from)
        .collect()
}

/// Split text into lowercase words with punctuation removed.
///
/// Unlike [`tokenize`], nothing is filtered out.
pub fn split_words(text: &str) -> Vec<String> {
    strip_punctuation(&text.to_lowercase())
        .split_whitespace()
        .map(String::from)
        .collect()
}

/// Check if a word is a stop word.
pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

fn strip_punctuation(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect()
}
