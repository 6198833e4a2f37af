//! Whole-document statistics and coarse sentiment classification.

use serde::{Deserialize, Serialize};

/// Words read per minute when estimating reading time.
const WORDS_PER_MINUTE: f64 = 200.0;

/// Polarity above which a document is classified positive.
const POSITIVE_THRESHOLD: f64 = 0.1;
/// Polarity below which a document is classified negative.
const NEGATIVE_THRESHOLD: f64 = -0.1;

/// Simple size statistics for a document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentStats {
    /// Whitespace-separated word count.
    pub word_count: usize,
    /// Estimated reading time at 200 words per minute, rounded.
    pub reading_time_minutes: u64,
}

impl DocumentStats {
    /// Compute statistics for `text`.
    pub fn of(text: &str) -> Self {
        let word_count = text.split_whitespace().count();
        let reading_time_minutes = (word_count as f64 / WORDS_PER_MINUTE).round() as u64;
        Self { word_count, reading_time_minutes }
    }
}

/// Coarse sentiment label.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    /// Polarity above 0.1.
    Positive,
    /// Polarity in [-0.1, 0.1].
    Neutral,
    /// Polarity below -0.1.
    Negative,
}

impl SentimentLabel {
    /// Classify a polarity score.
    pub fn from_polarity(polarity: f64) -> Self {
        if polarity > POSITIVE_THRESHOLD {
            Self::Positive
        } else if polarity < NEGATIVE_THRESHOLD {
            Self::Negative
        } else {
            Self::Neutral
        }
    }
}

/// A polarity score and its label.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Sentiment {
    /// Polarity in `[-1, 1]`.
    pub polarity: f64,
    /// Classification of `polarity`.
    pub label: SentimentLabel,
}

/// Maps text to a polarity score in `[-1, 1]`.
pub trait SentimentScorer: Send + Sync {
    /// Score `text`; 0.0 means neutral or unknown.
    fn polarity(&self, text: &str) -> f64;

    /// Score and classify `text`.
    fn sentiment(&self, text: &str) -> Sentiment {
        let polarity = self.polarity(text).clamp(-1.0, 1.0);
        Sentiment { polarity, label: SentimentLabel::from_polarity(polarity) }
    }
}

const POSITIVE_WORDS: &[(&str, f64)] = &[
    ("amazing", 0.6),
    ("awesome", 1.0),
    ("beautiful", 0.85),
    ("best", 1.0),
    ("better", 0.5),
    ("brilliant", 0.9),
    ("enjoy", 0.4),
    ("excellent", 1.0),
    ("fantastic", 0.4),
    ("fine", 0.4),
    ("good", 0.7),
    ("great", 0.8),
    ("happy", 0.8),
    ("helpful", 0.5),
    ("love", 0.5),
    ("nice", 0.6),
    ("perfect", 1.0),
    ("pleasant", 0.7),
    ("positive", 0.2),
    ("success", 0.3),
    ("successful", 0.75),
    ("wonderful", 1.0),
];

const NEGATIVE_WORDS: &[(&str, f64)] = &[
    ("angry", -0.5),
    ("annoying", -0.8),
    ("awful", -1.0),
    ("bad", -0.7),
    ("boring", -1.0),
    ("broken", -0.4),
    ("disappointing", -0.6),
    ("fail", -0.5),
    ("failure", -0.3),
    ("hate", -0.8),
    ("horrible", -1.0),
    ("negative", -0.3),
    ("painful", -0.7),
    ("poor", -0.4),
    ("sad", -0.5),
    ("terrible", -1.0),
    ("ugly", -0.7),
    ("worse", -0.4),
    ("worst", -1.0),
    ("wrong", -0.5),
];

const NEGATIONS: &[&str] = &["not", "no", "never", "isn't", "wasn't", "don't", "doesn't", "didn't"];

/// Lexicon-based polarity: the mean score of every sentiment-bearing word,
/// with the sign flipped when the previous word is a negation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconSentimentScorer;

impl LexiconSentimentScorer {
    fn score_word(word: &str) -> Option<f64> {
        POSITIVE_WORDS
            .iter()
            .chain(NEGATIVE_WORDS)
            .find(|(entry, _)| *entry == word)
            .map(|(_, score)| *score)
    }
}

impl SentimentScorer for LexiconSentimentScorer {
    fn polarity(&self, text: &str) -> f64 {
        let words: Vec<String> = text
            .split_whitespace()
            .map(|raw| {
                raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'').to_lowercase()
            })
            .filter(|word| !word.is_empty())
            .collect();

        let mut total = 0.0;
        let mut matched = 0usize;
        for (position, word) in words.iter().enumerate() {
            let Some(score) = Self::score_word(word) else {
                continue;
            };
            let negated =
                position > 0 && NEGATIONS.contains(&words[position - 1].as_str());
            total += if negated { -0.5 * score } else { score };
            matched += 1;
        }

        if matched == 0 { 0.0 } else { total / matched as f64 }
    }
}

/// Statistics and sentiment for a whole document.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct DocumentAnalysis {
    /// Size statistics.
    pub stats: DocumentStats,
    /// Coarse sentiment.
    pub sentiment: Sentiment,
}

impl DocumentAnalysis {
    /// Analyze `text` locally; no external service is involved.
    pub fn of(text: &str, scorer: &dyn SentimentScorer) -> Self {
        Self { stats: DocumentStats::of(text), sentiment: scorer.sentiment(text) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_count_words_and_round_reading_time() {
        let stats = DocumentStats::of(&"word ".repeat(350));
        assert_eq!(stats.word_count, 350);
        assert_eq!(stats.reading_time_minutes, 2);
        assert_eq!(DocumentStats::of(""), DocumentStats { word_count: 0, reading_time_minutes: 0 });
    }

    #[test]
    fn thresholds_classify_polarity() {
        assert_eq!(SentimentLabel::from_polarity(0.5), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_polarity(0.1), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_polarity(-0.1), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_polarity(-0.11), SentimentLabel::Negative);
    }

    #[test]
    fn lexicon_scores_text() {
        let scorer = LexiconSentimentScorer;
        assert_eq!(scorer.sentiment("What a great, wonderful day!").label, SentimentLabel::Positive);
        assert_eq!(scorer.sentiment("This was terrible and boring.").label, SentimentLabel::Negative);
        assert_eq!(scorer.sentiment("The table has four legs.").polarity, 0.0);
    }

    #[test]
    fn analysis_combines_stats_and_scorer() {
        let analysis = DocumentAnalysis::of("A wonderful, excellent city.", &LexiconSentimentScorer);
        assert_eq!(analysis.stats.word_count, 4);
        assert_eq!(analysis.sentiment.label, SentimentLabel::Positive);
    }

    #[test]
    fn negation_flips_sign() {
        let scorer = LexiconSentimentScorer;
        assert!(scorer.polarity("not good") < 0.0);
        assert!(scorer.polarity("not bad") > 0.0);
    }
}
