//! Priority selection of study items
//!
//! Items are ranked by difficulty plus behavioral boosts. The top share of the
//! result is taken strictly by rank (the priority head); the rest is a random
//! sample of the remaining items (the random tail).

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::config::ProfilerConfig;
use crate::difficulty::DifficultyScorer;
use crate::error::{Error, Result};
use crate::ledger::PerformanceLedger;
use crate::types::{HistoryRecord, VocabularyItem};

/// Boost per consecutive incorrect answer
const INCORRECT_STREAK_BOOST: f64 = 0.3;

/// Boost per day since last seen, applied once a word is over a day stale
const STALENESS_BOOST_PER_DAY: f64 = 0.2;

/// Cap on the staleness boost
const MAX_STALENESS_BOOST: f64 = 0.5;

/// Days a word must go unseen before the staleness boost applies
const STALENESS_THRESHOLD_DAYS: f64 = 1.0;

/// Priority reduction for mastered words
const MASTERY_PENALTY: f64 = 0.4;

/// Boost for words with no history at all
const NOVELTY_BOOST: f64 = 0.1;

/// An item with its ranking components
#[derive(Debug, Clone)]
pub struct ScoredItem<'i> {
    pub item: &'i VocabularyItem,
    pub difficulty: f64,
    pub boost: f64,
    pub score: f64,
}

/// Ranks a deck against a profile's ledger and embeddings
pub struct PrioritySelector<'a> {
    config: &'a ProfilerConfig,
    ledger: &'a PerformanceLedger,
    scorer: DifficultyScorer<'a>,
}

impl<'a> PrioritySelector<'a> {
    pub fn new(
        config: &'a ProfilerConfig,
        ledger: &'a PerformanceLedger,
        scorer: DifficultyScorer<'a>,
    ) -> Self {
        Self {
            config,
            ledger,
            scorer,
        }
    }

    /// Behavioral adjustment on top of difficulty.
    ///
    /// A word either has a record and gets the streak/staleness/mastery terms,
    /// or has none and gets the novelty boost.
    pub fn boost(&self, record: Option<&HistoryRecord>, now: DateTime<Utc>) -> f64 {
        let Some(record) = record else {
            return NOVELTY_BOOST;
        };

        let mut boost = 0.0;

        if record.consecutive_incorrect > 0 {
            boost += INCORRECT_STREAK_BOOST * record.consecutive_incorrect as f64;
        }

        let days_since_seen = record.days_since_seen(now);
        if days_since_seen > STALENESS_THRESHOLD_DAYS {
            boost += (STALENESS_BOOST_PER_DAY * days_since_seen).min(MAX_STALENESS_BOOST);
        }

        if record.consecutive_correct >= self.config.mastery_streak {
            boost -= MASTERY_PENALTY;
        }

        boost
    }

    /// Score every item and sort by score, highest first.
    ///
    /// The sort is stable: equal scores keep their input order.
    pub fn rank<'i>(&self, items: &'i [VocabularyItem], now: DateTime<Utc>) -> Vec<ScoredItem<'i>> {
        let mut scored: Vec<ScoredItem<'i>> = items
            .iter()
            .map(|item| {
                let difficulty = self.scorer.difficulty(item, now);
                let boost = self.boost(self.ledger.get(&item.origin), now);
                ScoredItem {
                    item,
                    difficulty,
                    boost,
                    score: difficulty + boost,
                }
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored
    }

    /// Pick up to `size` items: a priority head by rank, then a shuffled tail.
    ///
    /// `size` is clamped to the number of items. An empty deck yields an empty
    /// result; `size == 0` is a caller error.
    pub fn prioritize<'i, R: Rng + ?Sized>(
        &self,
        items: &'i [VocabularyItem],
        size: usize,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Vec<&'i VocabularyItem>> {
        if size == 0 {
            return Err(Error::InvalidSize(size));
        }
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let size = size.min(items.len());
        let ranked = self.rank(items, now);

        let head_count = ((size as f64 * self.config.priority_ratio).floor() as usize).min(size);
        let tail_count = size - head_count;

        let mut selected: Vec<usize> = (0..head_count.min(ranked.len())).collect();

        if ranked.len() > head_count && tail_count > 0 {
            let mut pool: Vec<usize> = (head_count..ranked.len()).collect();
            pool.shuffle(rng);
            selected.extend(pool.into_iter().take(tail_count));
        }

        // top up in rank order if the head and tail came up short
        if selected.len() < size {
            for idx in 0..ranked.len() {
                if selected.len() >= size {
                    break;
                }
                if !selected.contains(&idx) {
                    selected.push(idx);
                }
            }
        }

        selected.truncate(size);

        debug!(
            "Prioritized {} of {} items ({} by rank, {} sampled)",
            selected.len(),
            items.len(),
            head_count,
            selected.len().saturating_sub(head_count)
        );

        Ok(selected.into_iter().map(|idx| ranked[idx].item).collect())
    }
}

/// Unprioritized ordering for callers without a usable profile
pub fn fallback_order<'i, R: Rng + ?Sized>(
    items: &'i [VocabularyItem],
    size: usize,
    rng: &mut R,
) -> Vec<&'i VocabularyItem> {
    let mut shuffled: Vec<&VocabularyItem> = items.iter().collect();
    shuffled.shuffle(rng);
    shuffled.truncate(size);
    shuffled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::difficulty::NeutralFrequency;
    use crate::embedding::EmbeddingModel;
    use chrono::Duration;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::{BTreeMap, HashSet};

    fn deck(words: &[&str]) -> Vec<VocabularyItem> {
        words
            .iter()
            .map(|w| VocabularyItem::new(*w, format!("{}-t", w)))
            .collect()
    }

    fn record(streak_correct: u32, streak_incorrect: u32, last_seen: DateTime<Utc>) -> HistoryRecord {
        let total = (streak_correct + streak_incorrect).max(1);
        HistoryRecord {
            correct: streak_correct.min(total),
            total,
            first_seen: last_seen,
            last_seen,
            consecutive_correct: streak_correct,
            consecutive_incorrect: streak_incorrect,
        }
    }

    struct Fixture {
        config: ProfilerConfig,
        ledger: PerformanceLedger,
        embeddings: EmbeddingModel,
    }

    impl Fixture {
        fn new(records: BTreeMap<String, HistoryRecord>) -> Self {
            Self {
                config: ProfilerConfig::default(),
                ledger: PerformanceLedger::from_records(records),
                embeddings: EmbeddingModel::new(),
            }
        }

        fn selector(&self) -> PrioritySelector<'_> {
            let scorer =
                DifficultyScorer::new(&self.config, &self.embeddings, &self.ledger, &NeutralFrequency);
            PrioritySelector::new(&self.config, &self.ledger, scorer)
        }
    }

    #[test]
    fn test_empty_items() {
        let fx = Fixture::new(BTreeMap::new());
        let mut rng = StdRng::seed_from_u64(1);
        let result = fx.selector().prioritize(&[], 10, Utc::now(), &mut rng).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_zero_size_is_error() {
        let fx = Fixture::new(BTreeMap::new());
        let items = deck(&["a", "b"]);
        let mut rng = StdRng::seed_from_u64(1);
        let err = fx.selector().prioritize(&items, 0, Utc::now(), &mut rng).unwrap_err();
        assert!(matches!(err, Error::InvalidSize(0)));
    }

    #[test]
    fn test_returns_exactly_size_distinct_items() {
        let fx = Fixture::new(BTreeMap::new());
        let items = deck(&["jeden", "dwa", "trzy", "cztery", "pięć", "sześć", "siedem", "osiem"]);
        let now = Utc::now();

        for size in 1..=items.len() {
            let mut rng = StdRng::seed_from_u64(size as u64);
            let result = fx.selector().prioritize(&items, size, now, &mut rng).unwrap();
            assert_eq!(result.len(), size);

            let unique: HashSet<&str> = result.iter().map(|i| i.origin.as_str()).collect();
            assert_eq!(unique.len(), size);
            assert!(result.iter().all(|r| items.contains(*r)));
        }
    }

    #[test]
    fn test_oversized_request_is_clamped() {
        let fx = Fixture::new(BTreeMap::new());
        let items = deck(&["a", "bb", "ccc"]);
        let mut rng = StdRng::seed_from_u64(5);
        let result = fx.selector().prioritize(&items, 25, Utc::now(), &mut rng).unwrap();
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn test_head_is_top_ranked() {
        let now = Utc::now();
        let mut records = BTreeMap::new();
        records.insert("zły".to_string(), record(0, 3, now));
        records.insert("trudny".to_string(), record(0, 2, now));
        let fx = Fixture::new(records);
        let items = deck(&["łatwy", "trudny", "nowy", "zły", "inny"]);

        let mut rng = StdRng::seed_from_u64(9);
        let result = fx.selector().prioritize(&items, 3, now, &mut rng).unwrap();

        // floor(3 * 0.7) = 2 items by rank
        assert_eq!(result[0].origin, "zły");
        assert_eq!(result[1].origin, "trudny");
    }

    #[test]
    fn test_stable_ties_preserve_input_order() {
        let fx = Fixture::new(BTreeMap::new());
        // identical length, no history, no embeddings: equal scores
        let items = deck(&["abc", "def", "ghi", "jkl"]);
        let ranked = fx.selector().rank(&items, Utc::now());

        let order: Vec<&str> = ranked.iter().map(|s| s.item.origin.as_str()).collect();
        assert_eq!(order, vec!["abc", "def", "ghi", "jkl"]);
    }

    #[test]
    fn test_incorrect_streak_outranks() {
        let now = Utc::now();
        let mut records = BTreeMap::new();
        records.insert("pies".to_string(), record(0, 1, now));
        records.insert("ryba".to_string(), record(0, 3, now));
        let fx = Fixture::new(records);
        let items = deck(&["pies", "ryba"]);

        let mut rng = StdRng::seed_from_u64(17);
        let result = fx.selector().prioritize(&items, 2, now, &mut rng).unwrap();
        assert_eq!(result[0].origin, "ryba");
    }

    #[test]
    fn test_mastery_penalty_is_exact() {
        let now = Utc::now();
        let fx = Fixture::new(BTreeMap::new());
        let selector = fx.selector();

        let mastered = record(4, 0, now);
        let mut neutral = mastered.clone();
        neutral.consecutive_correct = 0;

        let diff = selector.boost(Some(&mastered), now) - selector.boost(Some(&neutral), now);
        assert!((diff + 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_novelty_boost_is_exact() {
        let now = Utc::now();
        let fx = Fixture::new(BTreeMap::new());
        let selector = fx.selector();

        let seen = HistoryRecord::new(now);
        let diff = selector.boost(None, now) - selector.boost(Some(&seen), now);
        assert!((diff - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_staleness_boost() {
        let now = Utc::now();
        let fx = Fixture::new(BTreeMap::new());
        let selector = fx.selector();

        let fresh = record(1, 0, now - Duration::hours(20));
        assert_eq!(selector.boost(Some(&fresh), now), 0.0);

        let two_days = record(1, 0, now - Duration::days(2));
        assert!((selector.boost(Some(&two_days), now) - 0.4).abs() < 1e-9);

        let month = record(1, 0, now - Duration::days(30));
        assert!((selector.boost(Some(&month), now) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_boost_terms_are_additive() {
        let now = Utc::now();
        let fx = Fixture::new(BTreeMap::new());
        let record = record(0, 2, now - Duration::days(10));
        let boost = fx.selector().boost(Some(&record), now);
        assert!((boost - (0.6 + 0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_seeded_selection_is_reproducible() {
        let fx = Fixture::new(BTreeMap::new());
        let items = deck(&["a", "bb", "ccc", "dddd", "eeeee", "ffffff", "ggggggg", "hhhhhhhh"]);
        let now = Utc::now();

        let first = fx
            .selector()
            .prioritize(&items, 5, now, &mut StdRng::seed_from_u64(99))
            .unwrap();
        let second = fx
            .selector()
            .prioritize(&items, 5, now, &mut StdRng::seed_from_u64(99))
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_full_ratio_takes_everything_by_rank() {
        let mut fx = Fixture::new(BTreeMap::new());
        fx.config.priority_ratio = 1.0;
        let items = deck(&["a", "bbbbbbbbbb", "ccccc"]);
        let mut rng = StdRng::seed_from_u64(3);

        let result = fx.selector().prioritize(&items, 3, Utc::now(), &mut rng).unwrap();
        let order: Vec<&str> = result.iter().map(|i| i.origin.as_str()).collect();
        assert_eq!(order, vec!["bbbbbbbbbb", "ccccc", "a"]);
    }

    #[test]
    fn test_fallback_order() {
        let items = deck(&["a", "b", "c", "d"]);
        let mut rng = StdRng::seed_from_u64(4);

        let result = fallback_order(&items, 2, &mut rng);
        assert_eq!(result.len(), 2);

        let all = fallback_order(&items, 10, &mut rng);
        assert_eq!(all.len(), 4);
    }
}
