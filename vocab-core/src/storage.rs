//! File persistence for a profile
//!
//! The ledger is a versioned, pretty-printed JSON document. Embeddings are a
//! binary blob: a magic tag, a bincode-encoded format version, then the
//! bincode-encoded payload. Both are written to a uniquely named temporary
//! file in the target directory and renamed into place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::config::ProfilerConfig;
use crate::embedding::EmbeddingModel;
use crate::error::{Error, Result};
use crate::ledger::PerformanceLedger;
use crate::types::{EMBEDDING_DIM, Embedding, HistoryRecord};

/// Current ledger document version
pub const LEDGER_VERSION: u32 = 1;

/// Current embedding blob version
pub const EMBEDDING_VERSION: u32 = 1;

const EMBEDDING_MAGIC: &[u8; 4] = b"VEMB";

const APP_NAME: &str = "vocab";
const LEDGER_FILE: &str = "user_profile.json";
const EMBEDDING_FILE: &str = "vocab_model.bin";

/// Storage locations a profile is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePaths {
    pub history: PathBuf,
    pub embeddings: PathBuf,
}

impl ProfilePaths {
    pub fn new(history: impl Into<PathBuf>, embeddings: impl Into<PathBuf>) -> Self {
        Self {
            history: history.into(),
            embeddings: embeddings.into(),
        }
    }

    /// Per-deck paths under `data_dir/<deck_id>/`
    pub fn for_deck<P: AsRef<Path>>(data_dir: P, deck_id: &str) -> Self {
        let dir = data_dir.as_ref().join(deck_id);
        Self {
            history: dir.join(LEDGER_FILE),
            embeddings: dir.join(EMBEDDING_FILE),
        }
    }

    /// Per-deck paths under the platform's local data directory
    pub fn default_for_deck(deck_id: &str) -> Self {
        Self::for_deck(default_data_dir(), deck_id)
    }
}

/// Local data directory for the application, or `.` if the platform has none
pub fn default_data_dir() -> PathBuf {
    match dirs::data_local_dir() {
        Some(dir) => dir.join(APP_NAME),
        None => PathBuf::from("."),
    }
}

#[derive(Serialize)]
struct LedgerDocumentRef<'a> {
    version: u32,
    words: &'a BTreeMap<String, HistoryRecord>,
}

#[derive(Deserialize)]
struct LedgerDocument {
    version: u32,
    #[serde(default)]
    words: BTreeMap<String, HistoryRecord>,
}

/// Unversioned word map with float Unix-second timestamps
#[derive(Deserialize, Default)]
#[serde(default)]
struct LegacyRecord {
    correct: u32,
    total: u32,
    first_seen: f64,
    last_seen: f64,
    consecutive_correct: u32,
    consecutive_incorrect: u32,
}

impl From<LegacyRecord> for HistoryRecord {
    fn from(legacy: LegacyRecord) -> Self {
        Self {
            correct: legacy.correct,
            total: legacy.total.max(legacy.correct),
            first_seen: from_unix_seconds(legacy.first_seen),
            last_seen: from_unix_seconds(legacy.last_seen),
            consecutive_correct: legacy.consecutive_correct,
            consecutive_incorrect: legacy.consecutive_incorrect,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AnyLedgerDocument {
    Versioned(LedgerDocument),
    Legacy(BTreeMap<String, LegacyRecord>),
}

#[derive(Serialize, Deserialize)]
struct EmbeddingPayload {
    dimension: u32,
    saved_at_ms: i64,
    embeddings: HashMap<String, Vec<f64>>,
}

/// Load the ledger; a missing file is an empty ledger
pub fn load_ledger<P: AsRef<Path>>(path: P) -> Result<PerformanceLedger> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(PerformanceLedger::new());
    }

    let json = fs::read_to_string(path)?;
    let document: AnyLedgerDocument = serde_json::from_str(&json)?;

    let records = match document {
        AnyLedgerDocument::Versioned(doc) => {
            if doc.version > LEDGER_VERSION {
                return Err(Error::UnsupportedVersion {
                    kind: "ledger",
                    found: doc.version,
                });
            }
            doc.words
        }
        AnyLedgerDocument::Legacy(words) => {
            debug!("Converting legacy ledger at {}", path.display());
            words.into_iter().map(|(w, r)| (w, r.into())).collect()
        }
    };

    Ok(PerformanceLedger::from_records(records))
}

/// Write the ledger as a versioned JSON document
pub fn save_ledger<P: AsRef<Path>>(path: P, ledger: &PerformanceLedger) -> Result<()> {
    let document = LedgerDocumentRef {
        version: LEDGER_VERSION,
        words: ledger.records(),
    };
    let json = serde_json::to_string_pretty(&document)?;
    write_atomic(path.as_ref(), json.as_bytes())
}

/// Load the embedding map with the default component bound
pub fn load_embeddings<P: AsRef<Path>>(path: P) -> Result<EmbeddingModel> {
    load_embeddings_within(path, ProfilerConfig::default().embedding_bound)
}

/// Load the embedding map; a missing file is an empty map.
///
/// Vectors with a non-finite component or one outside `[-bound, bound]`
/// make the whole blob corrupt.
pub fn load_embeddings_within<P: AsRef<Path>>(path: P, bound: f64) -> Result<EmbeddingModel> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(EmbeddingModel::new());
    }

    let bytes = fs::read(path)?;
    let body = bytes
        .strip_prefix(EMBEDDING_MAGIC.as_slice())
        .ok_or_else(|| Error::Corrupt("embedding blob has no magic header".to_string()))?;

    let config = bincode::config::standard();
    let (version, consumed): (u32, usize) = bincode::serde::decode_from_slice(body, config)?;
    if version != EMBEDDING_VERSION {
        return Err(Error::UnsupportedVersion {
            kind: "embedding",
            found: version,
        });
    }

    let (payload, _): (EmbeddingPayload, usize) =
        bincode::serde::decode_from_slice(&body[consumed..], config)?;

    if payload.dimension as usize != EMBEDDING_DIM {
        return Err(Error::Corrupt(format!(
            "embedding dimension {} does not match {}",
            payload.dimension, EMBEDDING_DIM
        )));
    }

    let mut vectors = HashMap::with_capacity(payload.embeddings.len());
    for (word, values) in payload.embeddings {
        let vector: Embedding = values.try_into().map_err(|v: Vec<f64>| {
            Error::Corrupt(format!("vector for '{}' has {} components", word, v.len()))
        })?;
        if let Some(bad) = vector
            .iter()
            .find(|c| !c.is_finite() || c.abs() > bound)
        {
            return Err(Error::Corrupt(format!(
                "vector for '{}' has out-of-range component {}",
                word, bad
            )));
        }
        vectors.insert(word, vector);
    }

    debug!(
        "Loaded {} embeddings saved at {} ms",
        vectors.len(),
        payload.saved_at_ms
    );

    Ok(EmbeddingModel::from_map(vectors))
}

/// Write the embedding map as a versioned binary blob
pub fn save_embeddings<P: AsRef<Path>>(
    path: P,
    model: &EmbeddingModel,
    saved_at: DateTime<Utc>,
) -> Result<()> {
    let payload = EmbeddingPayload {
        dimension: EMBEDDING_DIM as u32,
        saved_at_ms: saved_at.timestamp_millis(),
        embeddings: model
            .as_map()
            .iter()
            .map(|(word, vector)| (word.clone(), vector.to_vec()))
            .collect(),
    };

    let config = bincode::config::standard();
    let mut bytes = EMBEDDING_MAGIC.to_vec();
    bytes.extend(bincode::serde::encode_to_vec(EMBEDDING_VERSION, config)?);
    bytes.extend(bincode::serde::encode_to_vec(&payload, config)?);

    write_atomic(path.as_ref(), &bytes)
}

/// Write to a fresh temp file beside the target, then rename over it.
///
/// Concurrent writers never share a temp file.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

fn from_unix_seconds(secs: f64) -> DateTime<Utc> {
    if !secs.is_finite() {
        return DateTime::<Utc>::default();
    }
    DateTime::<Utc>::from_timestamp_micros((secs * 1_000_000.0) as i64).unwrap_or_default()
}
