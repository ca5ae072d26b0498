//! Performance ledger: per-word attempt history

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::collections::HashSet;
use tracing::debug;

use crate::config::ProfilerConfig;
use crate::types::{HistoryRecord, Outcome, SECONDS_PER_DAY, UserStats, seconds_between};

/// Interaction history keyed by origin text.
///
/// Records are created on the first outcome for a word and never removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceLedger {
    records: BTreeMap<String, HistoryRecord>,
}

impl PerformanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: BTreeMap<String, HistoryRecord>) -> Self {
        Self { records }
    }

    /// Record one attempt for `word`, creating its record if needed
    pub fn record(&mut self, word: &str, outcome: Outcome, now: DateTime<Utc>) -> &HistoryRecord {
        let record = self
            .records
            .entry(word.to_string())
            .or_insert_with(|| HistoryRecord::new(now));
        record.apply(outcome, now);

        debug!(
            "Recorded {:?} for '{}' ({}/{} correct)",
            outcome, word, record.correct, record.total
        );

        record
    }

    pub fn get(&self, word: &str) -> Option<&HistoryRecord> {
        self.records.get(word)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HistoryRecord)> {
        self.records.iter()
    }

    pub fn records(&self) -> &BTreeMap<String, HistoryRecord> {
        &self.records
    }

    /// Aggregate statistics across every tracked word
    pub fn stats(&self, config: &ProfilerConfig, now: DateTime<Utc>) -> UserStats {
        if self.records.is_empty() {
            return UserStats::default();
        }

        let total_correct: u64 = self.records.values().map(|r| r.correct as u64).sum();
        let total_attempts: u64 = self.records.values().map(|r| r.total as u64).sum();
        let overall_accuracy = if total_attempts > 0 {
            total_correct as f64 / total_attempts as f64
        } else {
            0.0
        };

        let words_mastered = self
            .records
            .values()
            .filter(|r| r.consecutive_correct >= config.mastery_streak)
            .count();
        let words_struggling = self
            .records
            .values()
            .filter(|r| r.consecutive_incorrect >= config.struggling_streak)
            .count();

        // whole-day offsets truncate toward zero, so slightly-future timestamps land on day 0
        let window = config.activity_window_days as i64;
        let study_days: HashSet<i64> = self
            .records
            .values()
            .map(|r| (seconds_between(r.last_seen, now) / SECONDS_PER_DAY) as i64)
            .filter(|days_ago| *days_ago < window)
            .collect();

        UserStats {
            total_words_studied: self.records.len(),
            total_attempts,
            overall_accuracy,
            words_mastered,
            words_struggling,
            study_days: study_days.len(),
        }
    }
}
