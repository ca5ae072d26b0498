//! Character-statistics embedding model
//!
//! Each word gets a fixed-size vector derived from its surface form: letter
//! frequencies in the first 26 components, then length, diversity, spacing,
//! vowel, consonant-cluster and repetition ratios. After every study outcome
//! the vector is nudged by a small Gaussian step and clamped, so the map also
//! carries a learned per-word signal.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::config::ProfilerConfig;
use crate::error::{Error, Result};
use crate::types::{EMBEDDING_DIM, Embedding, Outcome};

const LETTER_DIMS: usize = 26;
const LENGTH_NORMALIZER: f64 = 20.0;
const VOWELS: &str = "aeiou";
const CONSONANTS: &str = "bcdfghjklmnpqrstvwxyz";

/// Per-word embedding store, created lazily and updated in place
#[derive(Debug, Clone, Default)]
pub struct EmbeddingModel {
    vectors: HashMap<String, Embedding>,
}

impl EmbeddingModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a previously persisted map
    pub fn from_map(vectors: HashMap<String, Embedding>) -> Self {
        Self { vectors }
    }

    /// Cached vector for `word`, deriving and caching it on first use
    pub fn embedding_for(&mut self, word: &str) -> Embedding {
        *self
            .vectors
            .entry(word.to_string())
            .or_insert_with(|| derive_features(word))
    }

    /// Cached vector if present, otherwise a freshly derived one; never caches
    pub fn peek_or_derive(&self, word: &str) -> Embedding {
        self.vectors
            .get(word)
            .copied()
            .unwrap_or_else(|| derive_features(word))
    }

    pub fn get(&self, word: &str) -> Option<&Embedding> {
        self.vectors.get(word)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.vectors.contains_key(word)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn as_map(&self) -> &HashMap<String, Embedding> {
        &self.vectors
    }

    /// Highest cosine similarity between `vector` and every other known word.
    ///
    /// Zero-norm pairs are skipped; `None` when nothing comparable remains.
    pub fn max_similarity(&self, word: &str, vector: &Embedding) -> Option<f64> {
        self.vectors
            .iter()
            .filter(|(other, _)| other.as_str() != word)
            .filter_map(|(_, other)| cosine_similarity(vector, other))
            .fold(None, |best, sim| match best {
                Some(b) if b >= sim => Some(b),
                _ => Some(sim),
            })
    }

    /// Nudge the word's vector after an outcome.
    ///
    /// A correct answer moves it against the sampled direction, an incorrect
    /// one along it. Components are clamped to the configured bound.
    pub fn reinforce<R: Rng + ?Sized>(
        &mut self,
        word: &str,
        outcome: Outcome,
        config: &ProfilerConfig,
        rng: &mut R,
    ) -> Result<()> {
        let noise = Normal::new(0.0, config.noise_std)
            .map_err(|e| Error::Config(format!("noise_std {}: {}", config.noise_std, e)))?;

        let vector = match self.vectors.entry(word.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(derive_features(word)),
        };

        let sign = if outcome.is_correct() { -1.0 } else { 1.0 };
        let bound = config.embedding_bound;

        for component in vector.iter_mut() {
            let step = sign * config.learning_rate * noise.sample(rng);
            *component = (*component + step).clamp(-bound, bound);
        }

        Ok(())
    }
}

/// Build the surface-form feature vector for a word
pub fn derive_features(word: &str) -> Embedding {
    let mut embedding = [0.0; EMBEDDING_DIM];

    let chars: Vec<char> = word.chars().collect();
    let lower: Vec<char> = word.to_lowercase().chars().collect();
    let len = chars.len();

    // letter counts over the first 26 characters, normalized by full length
    for c in lower.iter().take(LETTER_DIMS) {
        if c.is_ascii_lowercase() {
            embedding[(*c as u8 - b'a') as usize] += 1.0;
        }
    }
    if embedding[..LETTER_DIMS].iter().sum::<f64>() > 0.0 {
        for value in embedding[..LETTER_DIMS].iter_mut() {
            *value /= len as f64;
        }
    }

    let len_denom = len.max(1) as f64;
    let pair_denom = len.saturating_sub(1).max(1) as f64;

    let distinct = distinct_count(&chars);
    let distinct_lower = distinct_count(&lower);
    let spaces = chars.iter().filter(|c| **c == ' ').count();
    let vowels = lower.iter().filter(|c| VOWELS.contains(**c)).count();
    let clusters = lower
        .windows(2)
        .filter(|pair| CONSONANTS.contains(pair[0]) && CONSONANTS.contains(pair[1]))
        .count();

    embedding[26] = len as f64 / LENGTH_NORMALIZER;
    embedding[27] = distinct as f64 / len_denom;
    embedding[28] = spaces as f64 / pair_denom;
    embedding[29] = vowels as f64 / len_denom;
    embedding[30] = clusters as f64 / pair_denom;
    embedding[31] = len.saturating_sub(distinct_lower) as f64 / len_denom;

    embedding
}

/// Cosine similarity, `None` if either vector has zero norm
pub fn cosine_similarity(a: &Embedding, b: &Embedding) -> Option<f64> {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm = norm_a * norm_b;

    (norm > 0.0).then(|| dot / norm)
}

fn distinct_count(chars: &[char]) -> usize {
    let mut seen: Vec<char> = chars.to_vec();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}
