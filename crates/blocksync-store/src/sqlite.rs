//! SQLite implementation of the store traits.
//!
//! This is the persistent backend for a blocksync server. It uses rusqlite
//! with bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use blocksync_core::{Block, BlockHash, FileContent, FileMetaData, Snapshot};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{accepts_version, BlockStore, MetadataStore, UpdateOutcome};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Join(format!("spawn_blocking failed: {}", e)))?
    }
}

// Helper to encode a hash list to CBOR
fn encode_hashes(hashes: &[BlockHash]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(hashes, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

// Helper to decode a hash list from CBOR
fn decode_hashes(bytes: &[u8]) -> Result<Vec<BlockHash>> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Raw `files` row, decoded outside the rusqlite row callback.
struct FileRow {
    filename: String,
    version: i64,
    tombstone: bool,
    hashes: Vec<u8>,
}

impl FileRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            filename: row.get("filename")?,
            version: row.get("version")?,
            tombstone: row.get("tombstone")?,
            hashes: row.get("hashes")?,
        })
    }

    fn into_meta(self) -> Result<FileMetaData> {
        let version = u64::try_from(self.version).map_err(|_| {
            StoreError::InvalidData(format!(
                "negative version {} for {}",
                self.version, self.filename
            ))
        })?;
        let content = if self.tombstone {
            FileContent::Tombstone
        } else {
            FileContent::Live(decode_hashes(&self.hashes)?)
        };
        Ok(FileMetaData {
            filename: self.filename,
            version,
            content,
        })
    }
}

#[async_trait]
impl BlockStore for SqliteStore {
    async fn put_block(&self, block: &Block) -> Result<BlockHash> {
        let block = block.clone();
        self.with_conn(move |conn| {
            let hash = block.hash();
            conn.execute(
                "INSERT OR IGNORE INTO blocks (hash, data, stored_at) VALUES (?1, ?2, ?3)",
                params![hash.as_str(), block.as_bytes(), now_millis()],
            )?;
            Ok(hash)
        })
        .await
    }

    async fn get_block(&self, hash: &BlockHash) -> Result<Block> {
        let hash = hash.clone();
        self.with_conn(move |conn| {
            let data: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT data FROM blocks WHERE hash = ?1",
                    params![hash.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            data.map(Block::new)
                .ok_or(StoreError::BlockNotFound(hash))
        })
        .await
    }

    async fn has_blocks(&self, hashes: &[BlockHash]) -> Result<Vec<BlockHash>> {
        let hashes = hashes.to_vec();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached("SELECT 1 FROM blocks WHERE hash = ?1")?;
            let mut seen = HashSet::new();
            let mut present = Vec::new();
            for hash in hashes {
                if seen.contains(&hash) {
                    continue;
                }
                if stmt.exists(params![hash.as_str()])? {
                    present.push(hash.clone());
                }
                seen.insert(hash);
            }
            Ok(present)
        })
        .await
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn get_file_info_map(&self) -> Result<Snapshot> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT filename, version, tombstone, hashes FROM files")?;
            let rows = stmt
                .query_map([], FileRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut snapshot = Snapshot::new();
            for row in rows {
                let meta = row.into_meta()?;
                snapshot.insert(meta.filename.clone(), meta);
            }
            Ok(snapshot)
        })
        .await
    }

    async fn update_file(&self, candidate: &FileMetaData) -> Result<UpdateOutcome> {
        blocksync_core::validate_filename(&candidate.filename)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;

        let candidate = candidate.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;

            let stored: Option<i64> = tx
                .query_row(
                    "SELECT version FROM files WHERE filename = ?1",
                    params![candidate.filename],
                    |row| row.get(0),
                )
                .optional()?;
            let stored = stored.map(|v| v.max(0) as u64);

            if !accepts_version(stored, candidate.version) {
                return Ok(UpdateOutcome::rejected(stored.unwrap_or(0)));
            }

            let version = i64::try_from(candidate.version).map_err(|_| {
                StoreError::InvalidData(format!("version {} out of range", candidate.version))
            })?;
            let hashes = encode_hashes(candidate.content.hashes())?;

            tx.execute(
                "INSERT INTO files (filename, version, tombstone, hashes, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(filename) DO UPDATE SET
                    version = excluded.version,
                    tombstone = excluded.tombstone,
                    hashes = excluded.hashes,
                    updated_at = excluded.updated_at",
                params![
                    candidate.filename,
                    version,
                    candidate.is_tombstone(),
                    hashes,
                    now_millis(),
                ],
            )?;
            tx.commit()?;

            Ok(UpdateOutcome::accepted(candidate.version))
        })
        .await
    }
}
