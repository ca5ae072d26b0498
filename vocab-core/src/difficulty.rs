//! Difficulty scoring
//!
//! A word's difficulty is a weighted blend of four components, each roughly
//! within [0, 1]: surface length, corpus frequency, dissimilarity to other
//! known words, and the learner's own history with recency decay.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::config::ProfilerConfig;
use crate::embedding::EmbeddingModel;
use crate::ledger::PerformanceLedger;
use crate::types::{HistoryRecord, SECONDS_PER_DAY, VocabularyItem, seconds_between};

/// Score used whenever a component has no signal
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Word length at which the length component saturates
const LENGTH_SATURATION: f64 = 15.0;

/// Source of the frequency component
pub trait FrequencySource: Send + Sync {
    /// Difficulty contribution of how common `word` is, in [0, 1]
    fn frequency_score(&self, word: &str) -> f64;
}

/// Frequency source with no data; every word is neutral
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralFrequency;

impl FrequencySource for NeutralFrequency {
    fn frequency_score(&self, _word: &str) -> f64 {
        NEUTRAL_SCORE
    }
}

/// Frequency source backed by a ranked word list.
///
/// Rank 0 is the most common word and scores 0 (easiest); scores rise
/// linearly toward 1 for rarer words. Unlisted words are neutral.
#[derive(Debug, Clone, Default)]
pub struct FrequencyTable {
    ranks: HashMap<String, usize>,
}

impl FrequencyTable {
    /// Build from words ordered most common first; later duplicates are ignored
    pub fn from_ranked<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ranks = HashMap::new();
        for word in words {
            let next = ranks.len();
            ranks.entry(word.into().to_lowercase()).or_insert(next);
        }
        Self { ranks }
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

impl FrequencySource for FrequencyTable {
    fn frequency_score(&self, word: &str) -> f64 {
        match self.ranks.get(&word.to_lowercase()) {
            Some(rank) => *rank as f64 / self.ranks.len() as f64,
            None => NEUTRAL_SCORE,
        }
    }
}

/// Per-component view of a difficulty score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyBreakdown {
    pub length: f64,
    pub frequency: f64,
    pub similarity: f64,
    pub history: f64,
    pub total: f64,
}

/// Read-only scorer over a profile's ledger and embeddings
pub struct DifficultyScorer<'a> {
    config: &'a ProfilerConfig,
    embeddings: &'a EmbeddingModel,
    ledger: &'a PerformanceLedger,
    frequency: &'a dyn FrequencySource,
}

impl<'a> DifficultyScorer<'a> {
    pub fn new(
        config: &'a ProfilerConfig,
        embeddings: &'a EmbeddingModel,
        ledger: &'a PerformanceLedger,
        frequency: &'a dyn FrequencySource,
    ) -> Self {
        Self {
            config,
            embeddings,
            ledger,
            frequency,
        }
    }

    /// Weighted difficulty of an item at time `now`
    pub fn difficulty(&self, item: &VocabularyItem, now: DateTime<Utc>) -> f64 {
        self.breakdown(item, now).total
    }

    pub fn breakdown(&self, item: &VocabularyItem, now: DateTime<Utc>) -> DifficultyBreakdown {
        let word = item.origin.as_str();
        let weights = &self.config.weights;

        let length = length_score(word);
        let frequency = self.frequency.frequency_score(word);
        let similarity = self.similarity_score(word);
        let history = match self.ledger.get(word) {
            Some(record) => history_score(record, now, self.config.decay_window_days),
            None => NEUTRAL_SCORE,
        };

        let total = weights.length * length
            + weights.frequency * frequency
            + weights.similarity * similarity
            + weights.user_history * history;

        DifficultyBreakdown {
            length,
            frequency,
            similarity,
            history,
            total,
        }
    }

    /// `1 - max cosine similarity` against every other known word.
    ///
    /// Neutral until at least two words have embeddings. Unknown words are
    /// compared using a derived vector that is not cached.
    pub fn similarity_score(&self, word: &str) -> f64 {
        if self.embeddings.len() < 2 {
            return NEUTRAL_SCORE;
        }

        let vector = self.embeddings.peek_or_derive(word);
        match self.embeddings.max_similarity(word, &vector) {
            Some(best) => 1.0 - best,
            None => NEUTRAL_SCORE,
        }
    }
}

/// Length component, saturating at 15 characters
pub fn length_score(word: &str) -> f64 {
    (word.chars().count() as f64 / LENGTH_SATURATION).min(1.0)
}

/// History component: error rate blended toward neutral as the record ages.
///
/// `decay = exp(-age / window)`, so a fresh record is scored almost purely
/// on its error rate and an old one regresses to 0.5.
pub fn history_score(record: &HistoryRecord, now: DateTime<Utc>, window_days: f64) -> f64 {
    let Some(accuracy) = record.accuracy() else {
        return NEUTRAL_SCORE;
    };

    let raw = 1.0 - accuracy;
    let age = seconds_between(record.last_seen, now);
    let decay = (-age / (window_days * SECONDS_PER_DAY)).exp();

    raw * decay + NEUTRAL_SCORE * (1.0 - decay)
}
