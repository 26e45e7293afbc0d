//! Blocks, file metadata and snapshots.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::hash::BlockHash;

/// An immutable chunk of file content.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    data: Bytes,
}

impl Block {
    /// Wrap the given bytes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// The content address of this block.
    pub fn hash(&self) -> BlockHash {
        BlockHash::digest(&self.data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block").field("len", &self.data.len()).finish()
    }
}

/// What a file currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileContent {
    /// Ordered block hashes; concatenating the blocks reproduces the file.
    Live(Vec<BlockHash>),
    /// The file has been deleted.
    Tombstone,
}

impl FileContent {
    pub fn is_tombstone(&self) -> bool {
        matches!(self, FileContent::Tombstone)
    }

    /// Block hashes of a live file; empty for a tombstone.
    pub fn hashes(&self) -> &[BlockHash] {
        match self {
            FileContent::Live(hashes) => hashes,
            FileContent::Tombstone => &[],
        }
    }
}

/// Versioned description of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetaData {
    pub filename: String,
    pub version: u64,
    pub content: FileContent,
}

impl FileMetaData {
    /// Metadata for a live file.
    pub fn live(filename: impl Into<String>, version: u64, hashes: Vec<BlockHash>) -> Self {
        Self {
            filename: filename.into(),
            version,
            content: FileContent::Live(hashes),
        }
    }

    /// Metadata marking `filename` deleted at `version`.
    pub fn tombstone(filename: impl Into<String>, version: u64) -> Self {
        Self {
            filename: filename.into(),
            version,
            content: FileContent::Tombstone,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.content.is_tombstone()
    }

    pub fn block_hashes(&self) -> &[BlockHash] {
        self.content.hashes()
    }

    /// Check the filename and that the version is at least 1.
    pub fn validate(&self) -> Result<()> {
        validate_filename(&self.filename)?;
        if self.version == 0 {
            return Err(CoreError::InvalidVersion {
                filename: self.filename.clone(),
                version: self.version,
            });
        }
        Ok(())
    }
}

/// Filename to metadata. Ordered so that encodings are deterministic.
pub type Snapshot = BTreeMap<String, FileMetaData>;

/// Reject names that cannot live flat in the synced directory or in the index.
pub fn validate_filename(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', ',', '\n', '\r', '\0']);
    if invalid {
        return Err(CoreError::InvalidFilename(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_hash_matches_digest() {
        let block = Block::new(b"abcd".to_vec());
        assert_eq!(block.hash(), BlockHash::digest(b"abcd"));
        assert_eq!(block.len(), 4);
    }

    #[test]
    fn test_tombstone_has_no_hashes() {
        let meta = FileMetaData::tombstone("a.txt", 2);
        assert!(meta.is_tombstone());
        assert!(meta.block_hashes().is_empty());
    }

    #[test]
    fn test_validate_filename() {
        assert!(validate_filename("a.txt").is_ok());
        assert!(validate_filename(".hidden").is_ok());
        assert!(validate_filename("").is_err());
        assert!(validate_filename("..").is_err());
        assert!(validate_filename("dir/a.txt").is_err());
        assert!(validate_filename("a,b").is_err());
    }

    #[test]
    fn test_validate_rejects_version_zero() {
        let meta = FileMetaData::live("a.txt", 0, vec![]);
        assert!(matches!(
            meta.validate(),
            Err(CoreError::InvalidVersion { version: 0, .. })
        ));
    }
}
