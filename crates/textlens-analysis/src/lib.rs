//! Text analysis engine for the TextLens platform.
//!
//! Pure, deterministic text statistics: token counts, keyword
//! extraction, lexicon-based sentiment, and a readability rating derived
//! from sentence length. No I/O — callers persist the report themselves.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Keywords returned for a single analysis.
pub const DEFAULT_MAX_KEYWORDS: usize = 10;

/// Keywords returned per item in a batch (kept small to bound response size).
pub const BATCH_MAX_KEYWORDS: usize = 5;

/// Minimum keyword length in characters. Shorter tokens are mostly
/// stopwords and noise.
const MIN_KEYWORD_CHARS: usize = 4;

/// Sentiment classification of a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// Readability rating derived from average words per sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Readability {
    VeryEasy,
    Easy,
    Medium,
    Hard,
    VeryHard,
}

/// Raw counting statistics of a text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub words: usize,
    pub characters: usize,
    pub characters_without_spaces: usize,
    pub sentences: usize,
    pub paragraphs: usize,
    pub average_word_length: f64,
    pub average_sentence_length: f64,
}

/// A complete analysis report as stored and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub summary: String,
    pub statistics: Statistics,
    pub keywords: Vec<String>,
    pub sentiment: Sentiment,
    pub readability: Readability,
    /// RFC 3339 timestamp of when the report was produced.
    pub processed_at: String,
}

/// Analyzes a text with the default keyword count.
pub fn analyze(content: &str) -> AnalysisReport {
    analyze_with_options(content, DEFAULT_MAX_KEYWORDS)
}

/// Analyzes a text, returning at most `max_keywords` keywords.
pub fn analyze_with_options(content: &str, max_keywords: usize) -> AnalysisReport {
    let words = content.split_whitespace().count();
    let characters = content.chars().count();
    let characters_without_spaces = content.chars().filter(|c| !c.is_whitespace()).count();
    let sentences = count_sentences(content);
    let paragraphs = count_paragraphs(content);

    let average_word_length = if words == 0 {
        0.0
    } else {
        characters as f64 / words as f64
    };
    let average_sentence_length = if sentences == 0 {
        0.0
    } else {
        words as f64 / sentences as f64
    };

    AnalysisReport {
        summary: format!(
            "The text contains {words} words, {sentences} sentences, and {paragraphs} paragraphs."
        ),
        statistics: Statistics {
            words,
            characters,
            characters_without_spaces,
            sentences,
            paragraphs,
            average_word_length,
            average_sentence_length,
        },
        keywords: extract_keywords(content, max_keywords),
        sentiment: score_sentiment(content),
        readability: rate_readability(average_sentence_length),
        processed_at: Utc::now().to_rfc3339(),
    }
}

/// Counts sentences: segments split by `.`, `!`, `?` that contain
/// something other than whitespace.
fn count_sentences(content: &str) -> usize {
    content
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count()
}

/// Counts paragraphs: blocks separated by blank lines.
fn count_paragraphs(content: &str) -> usize {
    let mut paragraphs = 0;
    let mut in_paragraph = false;
    for line in content.lines() {
        if line.trim().is_empty() {
            in_paragraph = false;
        } else if !in_paragraph {
            paragraphs += 1;
            in_paragraph = true;
        }
    }
    paragraphs
}

/// Extracts the most frequent alphabetic tokens longer than
/// `MIN_KEYWORD_CHARS - 1` characters. Ties break alphabetically so the
/// output is deterministic.
pub fn extract_keywords(content: &str, max_keywords: usize) -> Vec<String> {
    let lowered = content.to_lowercase();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for token in lowered.split(|c: char| !c.is_alphabetic()) {
        if token.chars().count() >= MIN_KEYWORD_CHARS {
            *counts.entry(token).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(max_keywords)
        .map(|(word, _)| word.to_string())
        .collect()
}

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "happy", "success", "love", "wonderful",
];
const NEGATIVE_WORDS: &[&str] = &[
    "bad", "poor", "fail", "sad", "terrible", "hate", "awful",
];

/// Scores sentiment by counting lexicon hits per whitespace token.
/// Substring matching is intentional: "successful" counts as "success".
pub fn score_sentiment(content: &str) -> Sentiment {
    let lowered = content.to_lowercase();
    let mut positive = 0usize;
    let mut negative = 0usize;

    for token in lowered.split_whitespace() {
        if POSITIVE_WORDS.iter().any(|w| token.contains(w)) {
            positive += 1;
        }
        if NEGATIVE_WORDS.iter().any(|w| token.contains(w)) {
            negative += 1;
        }
    }

    if positive > negative {
        Sentiment::Positive
    } else if negative > positive {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

/// Maps average words per sentence to a readability rating.
pub fn rate_readability(average_sentence_length: f64) -> Readability {
    if average_sentence_length < 10.0 {
        Readability::VeryEasy
    } else if average_sentence_length < 15.0 {
        Readability::Easy
    } else if average_sentence_length < 20.0 {
        Readability::Medium
    } else if average_sentence_length < 25.0 {
        Readability::Hard
    } else {
        Readability::VeryHard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_basic_statistics() {
        let report = analyze("Hello world. This is a test!\n\nSecond paragraph here.");
        assert_eq!(report.statistics.words, 9);
        assert_eq!(report.statistics.sentences, 3);
        assert_eq!(report.statistics.paragraphs, 2);
        assert!(report.statistics.characters > report.statistics.characters_without_spaces);
    }

    #[test]
    fn empty_content_yields_zeroes() {
        let report = analyze("");
        assert_eq!(report.statistics.words, 0);
        assert_eq!(report.statistics.sentences, 0);
        assert_eq!(report.statistics.paragraphs, 0);
        assert_eq!(report.statistics.average_word_length, 0.0);
        assert_eq!(report.statistics.average_sentence_length, 0.0);
        assert_eq!(report.sentiment, Sentiment::Neutral);
        assert!(report.keywords.is_empty());
    }

    #[test]
    fn punctuation_only_has_no_sentences() {
        let report = analyze("...!!!???");
        assert_eq!(report.statistics.sentences, 0);
        // One whitespace token, zero sentences — the ratio must not blow up.
        assert_eq!(report.statistics.average_sentence_length, 0.0);
    }

    #[test]
    fn keywords_ranked_by_frequency_then_alpha() {
        let keywords = extract_keywords(
            "rust rust rust tokio tokio axum axum serde once",
            3,
        );
        assert_eq!(keywords, vec!["rust", "axum", "tokio"]);
    }

    #[test]
    fn short_tokens_are_not_keywords() {
        let keywords = extract_keywords("the the the cat cat analysis", 10);
        assert_eq!(keywords, vec!["analysis"]);
    }

    #[test]
    fn keyword_cap_respected() {
        let keywords = extract_keywords(
            "alpha bravo charlie delta echo foxtrot golf hotel india juliett kilo lima",
            BATCH_MAX_KEYWORDS,
        );
        assert_eq!(keywords.len(), BATCH_MAX_KEYWORDS);
    }

    #[test]
    fn sentiment_classification() {
        assert_eq!(score_sentiment("this is a great success"), Sentiment::Positive);
        assert_eq!(score_sentiment("a terrible, sad failure"), Sentiment::Negative);
        assert_eq!(score_sentiment("the sky is blue"), Sentiment::Neutral);
        // One positive, one negative: balanced.
        assert_eq!(score_sentiment("good but bad"), Sentiment::Neutral);
    }

    #[test]
    fn sentiment_matches_substrings() {
        assert_eq!(score_sentiment("a successful launch"), Sentiment::Positive);
    }

    #[test]
    fn readability_thresholds() {
        assert_eq!(rate_readability(0.0), Readability::VeryEasy);
        assert_eq!(rate_readability(9.9), Readability::VeryEasy);
        assert_eq!(rate_readability(10.0), Readability::Easy);
        assert_eq!(rate_readability(15.0), Readability::Medium);
        assert_eq!(rate_readability(20.0), Readability::Hard);
        assert_eq!(rate_readability(25.0), Readability::VeryHard);
    }

    #[test]
    fn report_serializes_with_snake_case_enums() {
        let report = analyze("A good day.");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["sentiment"], "positive");
        assert_eq!(json["readability"], "very_easy");
        assert!(json["processed_at"].as_str().is_some());
    }
}
