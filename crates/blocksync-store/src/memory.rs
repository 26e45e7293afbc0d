//! In-memory implementation of the store traits.
//!
//! This is the default server backend and the one used by tests. It has the
//! same semantics as SQLite but keeps everything in memory with no persistence.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use blocksync_core::{Block, BlockHash, FileMetaData, Snapshot};

use crate::error::{Result, StoreError};
use crate::traits::{accepts_version, BlockStore, MetadataStore, UpdateOutcome};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Blocks and metadata each sit
/// behind their own RwLock.
pub struct MemoryStore {
    blocks: RwLock<HashMap<BlockHash, Block>>,
    files: RwLock<Snapshot>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            blocks: RwLock::new(HashMap::new()),
            files: RwLock::new(Snapshot::new()),
        }
    }

    /// Number of distinct blocks stored.
    pub fn block_count(&self) -> Result<usize> {
        Ok(self.read_blocks()?.len())
    }

    fn read_blocks(&self) -> Result<RwLockReadGuard<'_, HashMap<BlockHash, Block>>> {
        self.blocks
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write_blocks(&self) -> Result<RwLockWriteGuard<'_, HashMap<BlockHash, Block>>> {
        self.blocks
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn read_files(&self) -> Result<RwLockReadGuard<'_, Snapshot>> {
        self.files
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write_files(&self) -> Result<RwLockWriteGuard<'_, Snapshot>> {
        self.files
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlockStore for MemoryStore {
    async fn put_block(&self, block: &Block) -> Result<BlockHash> {
        let hash = block.hash();
        self.write_blocks()?.insert(hash.clone(), block.clone());
        Ok(hash)
    }

    async fn get_block(&self, hash: &BlockHash) -> Result<Block> {
        self.read_blocks()?
            .get(hash)
            .cloned()
            .ok_or_else(|| StoreError::BlockNotFound(hash.clone()))
    }

    async fn has_blocks(&self, hashes: &[BlockHash]) -> Result<Vec<BlockHash>> {
        let blocks = self.read_blocks()?;
        let mut seen = HashSet::new();
        Ok(hashes
            .iter()
            .filter(|h| blocks.contains_key(*h) && seen.insert(*h))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn get_file_info_map(&self) -> Result<Snapshot> {
        Ok(self.read_files()?.clone())
    }

    async fn update_file(&self, candidate: &FileMetaData) -> Result<UpdateOutcome> {
        blocksync_core::validate_filename(&candidate.filename)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;

        // The write guard spans the read, the comparison and the insert.
        let mut files = self.write_files()?;
        let stored = files.get(&candidate.filename).map(|m| m.version);

        if !accepts_version(stored, candidate.version) {
            return Ok(UpdateOutcome::rejected(stored.unwrap_or(0)));
        }

        files.insert(candidate.filename.clone(), candidate.clone());
        Ok(UpdateOutcome::accepted(candidate.version))
    }
}
