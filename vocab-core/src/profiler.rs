//! Profiler facade
//!
//! Owns one deck's ledger and embeddings, records outcomes, and ranks items
//! for study. Mutating calls take an exclusive lock; ranking and stats share a
//! read lock. Persistence failures are logged and never undo in-memory state.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::config::ProfilerConfig;
use crate::difficulty::{DifficultyScorer, FrequencySource, NeutralFrequency};
use crate::embedding::EmbeddingModel;
use crate::error::Result;
use crate::ledger::PerformanceLedger;
use crate::selector::PrioritySelector;
use crate::storage::{self, ProfilePaths};
use crate::types::{Embedding, HistoryRecord, Outcome, UserStats, VocabularyItem};
use crate::writer::{BackgroundWriter, PersistMode, Snapshot, save_stores, write_stores};

/// Default number of items returned by a prioritization
pub const DEFAULT_SESSION_SIZE: usize = 25;

struct ProfileState {
    ledger: PerformanceLedger,
    embeddings: EmbeddingModel,
}

/// Adaptive vocabulary scheduler for one deck
pub struct Profiler {
    config: ProfilerConfig,
    paths: Option<ProfilePaths>,
    state: RwLock<ProfileState>,
    rng: Mutex<StdRng>,
    persist: Mutex<()>,
    frequency: Box<dyn FrequencySource>,
    writer: Option<BackgroundWriter>,
}

impl Profiler {
    /// Create an unbound, in-memory profile that never persists
    pub fn new(config: ProfilerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(
            config,
            None,
            PerformanceLedger::new(),
            EmbeddingModel::new(),
            None,
        ))
    }

    /// Open a profile bound to `paths`, writing through on every outcome
    pub fn open(paths: ProfilePaths, config: ProfilerConfig) -> Result<Self> {
        Self::open_with_mode(paths, config, PersistMode::WriteThrough)
    }

    /// Open a profile bound to `paths` with an explicit persistence mode.
    ///
    /// Missing or unreadable stores start empty; only an invalid config or a
    /// failure to start the writer thread is an error.
    pub fn open_with_mode(
        paths: ProfilePaths,
        config: ProfilerConfig,
        mode: PersistMode,
    ) -> Result<Self> {
        config.validate()?;

        let ledger = storage::load_ledger(&paths.history).unwrap_or_else(|e| {
            warn!(
                "Could not load user profile from {}: {}",
                paths.history.display(),
                e
            );
            PerformanceLedger::new()
        });

        let embeddings =
            storage::load_embeddings_within(&paths.embeddings, config.embedding_bound)
                .unwrap_or_else(|e| {
                    warn!(
                        "Could not load model from {}: {}",
                        paths.embeddings.display(),
                        e
                    );
                    EmbeddingModel::new()
                });

        info!(
            "Loaded profile with {} tracked words and {} embeddings",
            ledger.len(),
            embeddings.len()
        );

        let writer = match mode {
            PersistMode::WriteThrough => None,
            PersistMode::Background => Some(BackgroundWriter::spawn(paths.clone())?),
        };

        Ok(Self::from_parts(config, Some(paths), ledger, embeddings, writer))
    }

    fn from_parts(
        config: ProfilerConfig,
        paths: Option<ProfilePaths>,
        ledger: PerformanceLedger,
        embeddings: EmbeddingModel,
        writer: Option<BackgroundWriter>,
    ) -> Self {
        Self {
            config,
            paths,
            state: RwLock::new(ProfileState { ledger, embeddings }),
            rng: Mutex::new(StdRng::from_os_rng()),
            persist: Mutex::new(()),
            frequency: Box::new(NeutralFrequency),
            writer,
        }
    }

    /// Replace the randomness source with a seeded one
    pub fn with_seed(self, seed: u64) -> Self {
        *self.rng.lock() = StdRng::seed_from_u64(seed);
        self
    }

    /// Replace the frequency component of the difficulty score
    pub fn with_frequency_source<F: FrequencySource + 'static>(mut self, source: F) -> Self {
        self.frequency = Box::new(source);
        self
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    pub fn paths(&self) -> Option<&ProfilePaths> {
        self.paths.as_ref()
    }

    /// Record a correct answer
    pub fn mark_positive(&self, item: &VocabularyItem) {
        self.record(item, Outcome::Correct);
    }

    /// Record an incorrect answer
    pub fn mark_negative(&self, item: &VocabularyItem) {
        self.record(item, Outcome::Incorrect);
    }

    pub fn record(&self, item: &VocabularyItem, outcome: Outcome) {
        self.record_at(item, outcome, Utc::now());
    }

    /// Record an outcome at an explicit time, update the embedding, then persist
    pub fn record_at(&self, item: &VocabularyItem, outcome: Outcome, now: DateTime<Utc>) {
        let mut state = self.state.write();
        let word = item.origin.as_str();

        state.ledger.record(word, outcome, now);
        {
            let mut rng = self.rng.lock();
            // the config was validated, so this only fails on a broken invariant
            if let Err(e) = state
                .embeddings
                .reinforce(word, outcome, &self.config, &mut *rng)
            {
                warn!("Could not update embedding for '{}': {}", word, e);
            }
        }

        // persist while still holding the lock so writes follow mutation order
        let Some(paths) = &self.paths else {
            return;
        };
        match &self.writer {
            Some(writer) => writer.submit(Snapshot {
                ledger: state.ledger.clone(),
                embeddings: state.embeddings.clone(),
            }),
            None => {
                let _persist = self.persist.lock();
                write_stores(paths, &state.ledger, &state.embeddings);
            }
        }
    }

    /// Up to `size` items ordered for study; see [`PrioritySelector::prioritize`]
    pub fn get_prioritized_items(
        &self,
        items: &[VocabularyItem],
        size: usize,
    ) -> Result<Vec<VocabularyItem>> {
        self.get_prioritized_items_at(items, size, Utc::now())
    }

    pub fn get_prioritized_items_at(
        &self,
        items: &[VocabularyItem],
        size: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<VocabularyItem>> {
        let state = self.state.read();
        let scorer = DifficultyScorer::new(
            &self.config,
            &state.embeddings,
            &state.ledger,
            self.frequency.as_ref(),
        );
        let selector = PrioritySelector::new(&self.config, &state.ledger, scorer);

        let mut rng = self.rng.lock();
        let selected = selector.prioritize(items, size, now, &mut *rng)?;
        Ok(selected.into_iter().cloned().collect())
    }

    /// Current difficulty of a single item
    pub fn difficulty_of(&self, item: &VocabularyItem) -> f64 {
        let state = self.state.read();
        DifficultyScorer::new(
            &self.config,
            &state.embeddings,
            &state.ledger,
            self.frequency.as_ref(),
        )
        .difficulty(item, Utc::now())
    }

    /// Embedding for `word`, derived and cached on first reference
    pub fn embedding_for(&self, word: &str) -> Embedding {
        if let Some(vector) = self.state.read().embeddings.get(word) {
            return *vector;
        }
        self.state.write().embeddings.embedding_for(word)
    }

    /// Copy of the ledger record for `word`
    pub fn history(&self, word: &str) -> Option<HistoryRecord> {
        self.state.read().ledger.get(word).cloned()
    }

    pub fn tracked_words(&self) -> usize {
        self.state.read().ledger.len()
    }

    pub fn get_user_stats(&self) -> UserStats {
        self.get_user_stats_at(Utc::now())
    }

    pub fn get_user_stats_at(&self, now: DateTime<Utc>) -> UserStats {
        self.state.read().ledger.stats(&self.config, now)
    }

    /// Write both stores now, surfacing any error.
    ///
    /// In background mode the write is queued behind earlier snapshots and
    /// this call waits for it. Unbound profiles have nothing to write.
    pub fn save(&self) -> Result<()> {
        let Some(paths) = &self.paths else {
            return Ok(());
        };

        let state = self.state.read();
        match &self.writer {
            Some(writer) => {
                let snapshot = Snapshot {
                    ledger: state.ledger.clone(),
                    embeddings: state.embeddings.clone(),
                };
                drop(state);
                writer.save(snapshot)
            }
            None => {
                let _persist = self.persist.lock();
                save_stores(paths, &state.ledger, &state.embeddings)
            }
        }
    }

    /// Wait for queued background writes; a no-op when writing through
    pub fn flush(&self) {
        if let Some(writer) = &self.writer {
            writer.flush();
        }
    }
}
