//! Error types for the sync module.

use std::path::PathBuf;

use blocksync_core::{BlockHash, CoreError};
use blocksync_store::StoreError;
use thiserror::Error;

use crate::messages::ErrorCode;

/// Errors that can occur during sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The server has no block under this hash.
    #[error("block not found: {0}")]
    BlockNotFound(BlockHash),

    /// A compare-and-swap update was rejected.
    ///
    /// The engine resolves this itself; it never escapes a sync pass.
    #[error("version conflict on {filename}: tried {attempted}, server has {current_version}")]
    VersionConflict {
        filename: String,
        attempted: u64,
        current_version: u64,
    },

    /// A block exceeds the service's size ceiling.
    #[error("block of {size} bytes exceeds the {max} byte limit")]
    BlockTooLarge { size: usize, max: usize },

    /// Reading or writing a local file failed.
    #[error("local I/O error on {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Transport-level error.
    #[error("transport error: {0}")]
    TransportError(String),

    /// The server did not answer in time.
    #[error("{request} timed out after {elapsed:?}")]
    Timeout {
        request: &'static str,
        elapsed: std::time::Duration,
    },

    /// A request violated a service limit.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A frame exceeded the maximum size.
    #[error("frame of {size} bytes exceeds the {max} byte limit")]
    FrameTooLarge { size: usize, max: usize },

    /// Message encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// The server answered with an error.
    #[error("server error ({code:?}): {message}")]
    Remote { code: ErrorCode, message: String },

    /// The server answered with the wrong response kind.
    #[error("unexpected response: expected {expected}, got {got}")]
    UnexpectedResponse {
        expected: &'static str,
        got: &'static str,
    },

    /// Store operation failed.
    #[error("store error: {0}")]
    StoreError(#[from] StoreError),

    /// Invalid core value (hash, filename, index record, block size).
    #[error("{0}")]
    Core(#[from] CoreError),
}

impl SyncError {
    pub(crate) fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::LocalIo {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn transport(e: impl std::fmt::Display) -> Self {
        SyncError::TransportError(e.to_string())
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
