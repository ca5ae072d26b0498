//! Profiler configuration
//!
//! All tunables live here with their defaults. A config is validated once at
//! construction and treated as immutable afterwards.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Tolerance when checking that the difficulty weights sum to one
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Relative weight of each difficulty component
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyWeights {
    /// Surface-form length (default 0.2)
    pub length: f64,
    /// Corpus frequency of the word (default 0.3)
    pub frequency: f64,
    /// Dissimilarity to every other known word (default 0.25)
    pub similarity: f64,
    /// Personal performance history (default 0.25)
    pub user_history: f64,
}

impl Default for DifficultyWeights {
    fn default() -> Self {
        Self {
            length: 0.2,
            frequency: 0.3,
            similarity: 0.25,
            user_history: 0.25,
        }
    }
}

impl DifficultyWeights {
    pub fn sum(&self) -> f64 {
        self.length + self.frequency + self.similarity + self.user_history
    }

    fn validate(&self) -> Result<()> {
        let parts = [
            ("length", self.length),
            ("frequency", self.frequency),
            ("similarity", self.similarity),
            ("user_history", self.user_history),
        ];
        for (name, value) in parts {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!(
                    "weight '{}' must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::Config(format!(
                "difficulty weights must sum to 1.0, got {}",
                sum
            )));
        }

        Ok(())
    }
}

/// Tunables for scoring, selection and the reinforcement update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    pub weights: DifficultyWeights,
    /// Scale applied to the Gaussian nudge after each outcome
    pub learning_rate: f64,
    /// Standard deviation of the Gaussian nudge
    pub noise_std: f64,
    /// Embedding components are clamped to [-bound, bound]
    pub embedding_bound: f64,
    /// Time constant of the recency decay applied to history scores
    pub decay_window_days: f64,
    /// Correct streak at which a word counts as mastered
    pub mastery_streak: u32,
    /// Incorrect streak at which a word counts as struggling
    pub struggling_streak: u32,
    /// Share of a prioritized result taken strictly by score
    pub priority_ratio: f64,
    /// Trailing window for the study-day count
    pub activity_window_days: u32,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            weights: DifficultyWeights::default(),
            learning_rate: 0.01,
            noise_std: 0.1,
            embedding_bound: 2.0,
            decay_window_days: 7.0,
            mastery_streak: 3,
            struggling_streak: 2,
            priority_ratio: 0.7,
            activity_window_days: 30,
        }
    }
}

impl ProfilerConfig {
    /// Parse a config from JSON; absent fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reject configurations that indicate programmer error
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;

        if !self.learning_rate.is_finite() || self.learning_rate < 0.0 {
            return Err(Error::Config(format!(
                "learning_rate must be a non-negative number, got {}",
                self.learning_rate
            )));
        }
        if !self.noise_std.is_finite() || self.noise_std < 0.0 {
            return Err(Error::Config(format!(
                "noise_std must be a non-negative number, got {}",
                self.noise_std
            )));
        }
        if !self.embedding_bound.is_finite() || self.embedding_bound <= 0.0 {
            return Err(Error::Config(format!(
                "embedding_bound must be positive, got {}",
                self.embedding_bound
            )));
        }
        if !self.decay_window_days.is_finite() || self.decay_window_days <= 0.0 {
            return Err(Error::Config(format!(
                "decay_window_days must be positive, got {}",
                self.decay_window_days
            )));
        }
        if !(0.0..=1.0).contains(&self.priority_ratio) {
            return Err(Error::Config(format!(
                "priority_ratio must be within [0, 1], got {}",
                self.priority_ratio
            )));
        }
        if self.activity_window_days == 0 {
            return Err(Error::Config(
                "activity_window_days must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
