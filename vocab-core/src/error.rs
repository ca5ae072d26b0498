//! Error types for the vocabulary profiler

use thiserror::Error;

/// Result type alias using the profiler's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in the profiler
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid selection size: {0} (must be at least 1)")]
    InvalidSize(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Encoding error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("Decoding error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("Unsupported {kind} version: {found}")]
    UnsupportedVersion { kind: &'static str, found: u32 },

    #[error("Corrupt data: {0}")]
    Corrupt(String),
}
