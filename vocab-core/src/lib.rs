//! Vocab Core - Adaptive vocabulary scheduler
//!
//! Decides which vocabulary pairs a learner should study next from persisted
//! per-word performance history and a lightweight character-statistics
//! embedding, and learns from every reported outcome.

pub mod config;
pub mod deck;
pub mod difficulty;
pub mod embedding;
pub mod error;
pub mod ledger;
pub mod profiler;
pub mod selector;
pub mod storage;
pub mod types;
pub mod writer;

pub use error::{Error, Result};
pub use types::*;

/// Re-export the main components for convenience
pub use config::{DifficultyWeights, ProfilerConfig};
pub use deck::{DeckDirectory, ItemStore, parse_deck};
pub use difficulty::{DifficultyScorer, FrequencySource, FrequencyTable, NeutralFrequency};
pub use embedding::EmbeddingModel;
pub use ledger::PerformanceLedger;
pub use profiler::{DEFAULT_SESSION_SIZE, Profiler};
pub use selector::{PrioritySelector, fallback_order};
pub use storage::ProfilePaths;
pub use writer::PersistMode;
