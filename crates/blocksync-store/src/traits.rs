//! Store traits: the abstract interfaces for block and metadata persistence.
//!
//! These traits allow the service to be storage-agnostic. Implementations
//! include SQLite (persistent) and in-memory (default server, tests).

use async_trait::async_trait;
use blocksync_core::{Block, BlockHash, FileMetaData, Snapshot};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Result of a compare-and-swap metadata update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    /// Whether the candidate was stored.
    pub accepted: bool,
    /// The stored version after the call: the candidate's version when
    /// accepted, otherwise the version that blocked it (0 if none exists).
    pub current_version: u64,
}

impl UpdateOutcome {
    pub fn accepted(version: u64) -> Self {
        Self {
            accepted: true,
            current_version: version,
        }
    }

    pub fn rejected(current_version: u64) -> Self {
        Self {
            accepted: false,
            current_version,
        }
    }
}

/// The version rule shared by every metadata backend.
///
/// A new file must start at version 1; an existing one may only move to
/// exactly `stored + 1`.
pub fn accepts_version(stored: Option<u64>, candidate: u64) -> bool {
    match stored {
        None => candidate == 1,
        Some(stored) => stored.checked_add(1) == Some(candidate),
    }
}

/// Content-addressed block storage.
///
/// Puts are idempotent and commutative; entries are never removed.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Store a block under the SHA-256 of its bytes and return that hash.
    async fn put_block(&self, block: &Block) -> Result<BlockHash>;

    /// Fetch a block.
    ///
    /// # Errors
    /// [`StoreError::BlockNotFound`](crate::StoreError::BlockNotFound) if the
    /// hash is absent.
    async fn get_block(&self, hash: &BlockHash) -> Result<Block>;

    /// Return exactly the hashes from `hashes` that are stored, each once.
    async fn has_blocks(&self, hashes: &[BlockHash]) -> Result<Vec<BlockHash>>;
}

/// Versioned filename to metadata map.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// The full filename to metadata map.
    async fn get_file_info_map(&self) -> Result<Snapshot>;

    /// Compare-and-swap update.
    ///
    /// Accepted iff [`accepts_version`] holds for the stored version and the
    /// candidate's version. The read, the comparison and the write are atomic
    /// with respect to other calls for the same filename.
    async fn update_file(&self, candidate: &FileMetaData) -> Result<UpdateOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_file_must_start_at_one() {
        assert!(accepts_version(None, 1));
        assert!(!accepts_version(None, 0));
        assert!(!accepts_version(None, 2));
    }

    #[test]
    fn test_existing_file_advances_by_one() {
        assert!(accepts_version(Some(3), 4));
        assert!(!accepts_version(Some(3), 3));
        assert!(!accepts_version(Some(3), 5));
        assert!(!accepts_version(Some(3), 1));
        assert!(!accepts_version(Some(u64::MAX), 0));
    }
}
