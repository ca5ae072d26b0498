//! Core types used throughout the profiler

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of components in a word embedding
pub const EMBEDDING_DIM: usize = 32;

/// Fixed-size feature vector for a word's surface form
pub type Embedding = [f64; EMBEDDING_DIM];

/// Seconds in one day, used for recency arithmetic
pub(crate) const SECONDS_PER_DAY: f64 = 24.0 * 3600.0;

/// A single vocabulary pair from a deck.
///
/// Identity is the origin text; the profiler never mutates items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VocabularyItem {
    pub origin: String,
    pub translation: String,
    #[serde(default)]
    pub sound: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl VocabularyItem {
    pub fn new(origin: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            translation: translation.into(),
            sound: None,
            image: None,
        }
    }

    pub fn with_sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = Some(sound.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

impl fmt::Display for VocabularyItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.origin, self.translation)
    }
}

/// Result of a single study attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Correct,
    Incorrect,
}

impl Outcome {
    pub fn is_correct(self) -> bool {
        matches!(self, Outcome::Correct)
    }
}

impl From<bool> for Outcome {
    fn from(is_correct: bool) -> Self {
        if is_correct {
            Outcome::Correct
        } else {
            Outcome::Incorrect
        }
    }
}

/// Per-word interaction history.
///
/// `total >= correct` always holds, and once a word has been recorded exactly
/// one of the two streak counters is non-zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryRecord {
    pub correct: u32,
    pub total: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub consecutive_correct: u32,
    pub consecutive_incorrect: u32,
}

impl HistoryRecord {
    /// Create an empty record first seen at `now`
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            first_seen: now,
            last_seen: now,
            ..Default::default()
        }
    }

    /// Fold one attempt into the record
    pub fn apply(&mut self, outcome: Outcome, now: DateTime<Utc>) {
        self.total += 1;
        self.last_seen = now;

        match outcome {
            Outcome::Correct => {
                self.correct += 1;
                self.consecutive_correct += 1;
                self.consecutive_incorrect = 0;
            }
            Outcome::Incorrect => {
                self.consecutive_correct = 0;
                self.consecutive_incorrect += 1;
            }
        }
    }

    /// Share of correct attempts, `None` before the first attempt
    pub fn accuracy(&self) -> Option<f64> {
        (self.total > 0).then(|| self.correct as f64 / self.total as f64)
    }

    /// Fractional days elapsed between `last_seen` and `now`
    pub fn days_since_seen(&self, now: DateTime<Utc>) -> f64 {
        seconds_between(self.last_seen, now) / SECONDS_PER_DAY
    }
}

/// Aggregate learning statistics for one profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub total_words_studied: usize,
    pub total_attempts: u64,
    pub overall_accuracy: f64,
    pub words_mastered: usize,
    pub words_struggling: usize,
    /// Distinct days with activity in the trailing window, derived from each
    /// word's last_seen rather than a continuous streak
    pub study_days: usize,
}

/// Signed seconds from `earlier` to `later`, with sub-second precision
pub(crate) fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    let delta = later.signed_duration_since(earlier);
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_seconds() as f64,
    }
}
