//! Sentiment Scoring
//!
//! `SentimentAnalyzer` is the plug point for turning post text into a score in
//! [-1, 1]. `KeywordSentiment` is the built-in lexicon heuristic.

use std::collections::HashSet;

/// Text sentiment strategy
pub trait SentimentAnalyzer: Send + Sync {
    /// Score a single piece of text in [-1, 1]
    fn score(&self, text: &str) -> f64;

    /// Mean score over a set of posts, 0 when there are none
    fn score_all(&self, posts: &[String]) -> f64 {
        if posts.is_empty() {
            return 0.0;
        }
        posts.iter().map(|p| self.score(p)).sum::<f64>() / posts.len() as f64
    }

    fn name(&self) -> &'static str;
}

const VERY_POSITIVE: &[&str] = &[
    "moon", "moonshot", "gem", "100x", "1000x", "amazing", "incredible",
    "breakthrough", "revolutionary", "partnership", "massive", "huge",
];

const POSITIVE: &[&str] = &[
    "bullish", "buy", "good", "great", "potential", "promising", "growth",
    "opportunity", "undervalued", "accumulate",
];

const NEGATIVE: &[&str] = &[
    "bearish", "sell", "dump", "bad", "avoid", "scam", "ponzi", "rugpull",
    "suspicious", "overvalued",
];

const VERY_NEGATIVE: &[&str] = &[
    "scam", "fraud", "fake", "rug", "honeypot", "avoid", "warning",
    "manipulation", "pyramid", "sketchy",
];

/// Four-tier keyword lexicon.
///
/// Each word is checked against every tier independently, so a word listed in
/// two tiers contributes twice. The result is `score / (2 * matches)`.
#[derive(Debug, Clone)]
pub struct KeywordSentiment {
    very_positive: HashSet<&'static str>,
    positive: HashSet<&'static str>,
    negative: HashSet<&'static str>,
    very_negative: HashSet<&'static str>,
}

impl Default for KeywordSentiment {
    fn default() -> Self {
        Self {
            very_positive: VERY_POSITIVE.iter().copied().collect(),
            positive: POSITIVE.iter().copied().collect(),
            negative: NEGATIVE.iter().copied().collect(),
            very_negative: VERY_NEGATIVE.iter().copied().collect(),
        }
    }
}

impl KeywordSentiment {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SentimentAnalyzer for KeywordSentiment {
    fn score(&self, text: &str) -> f64 {
        let mut score = 0i64;
        let mut matches = 0u32;

        for word in tokenize(text) {
            let word = word.as_str();
            if self.very_positive.contains(word) {
                score += 2;
                matches += 1;
            }
            if self.positive.contains(word) {
                score += 1;
                matches += 1;
            }
            if self.negative.contains(word) {
                score -= 1;
                matches += 1;
            }
            if self.very_negative.contains(word) {
                score -= 2;
                matches += 1;
            }
        }

        if matches == 0 {
            0.0
        } else {
            score as f64 / (2.0 * matches as f64)
        }
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

/// Lower-case words with leading and trailing punctuation stripped
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
}

/// Engagement-rate virality in [0, 100]
pub fn virality_score(mentions: u64, engagement: u64, viral_rate: f64) -> f64 {
    if viral_rate <= 0.0 {
        return 0.0;
    }
    let rate = engagement as f64 / mentions.max(1) as f64;
    (rate / viral_rate * 100.0).min(100.0)
}
