//! Error types for blocksync core.

use thiserror::Error;

/// Errors raised while validating or decoding core values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid block hash: {0:?}")]
    InvalidBlockHash(String),

    #[error("block size must be greater than zero")]
    InvalidBlockSize,

    #[error("invalid filename: {0:?}")]
    InvalidFilename(String),

    #[error("invalid version {version} for {filename}: versions start at 1")]
    InvalidVersion { filename: String, version: u64 },

    #[error("malformed index at line {line}: {reason}")]
    MalformedIndex { line: usize, reason: String },

    #[error("block content does not match hash {expected}: got {actual}")]
    HashMismatch { expected: String, actual: String },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
