//! The client's base directory on disk.
//!
//! Files are flat: only regular files directly under the root take part in
//! sync. The index file, hidden files and names that cannot be represented
//! in the index are ignored.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use blocksync_core::{
    chunk_reader, decode_index, encode_index, hash_list, validate_filename, Block, BlockHash,
    CoreError, Snapshot, INDEX_FILE_NAME,
};
use tracing::{debug, warn};

use crate::error::{Result, SyncError};

/// Filename to the hashes of its blocks as they are on disk now.
pub type LocalScan = BTreeMap<String, Vec<BlockHash>>;

/// Result of scanning a directory.
#[derive(Debug, Default)]
pub struct DirScan {
    pub files: LocalScan,
    /// Eligible files whose content could not be read, with the error.
    pub unreadable: Vec<(String, SyncError)>,
}

const INDEX_TEMP_NAME: &str = ".index.txt.tmp";

/// A synced directory and the block size used to chunk it.
#[derive(Debug, Clone)]
pub struct LocalDir {
    root: PathBuf,
    block_size: usize,
}

impl LocalDir {
    pub fn new(root: impl Into<PathBuf>, block_size: usize) -> Result<Self> {
        if block_size == 0 {
            return Err(CoreError::InvalidBlockSize.into());
        }
        Ok(Self {
            root: root.into(),
            block_size,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Chunk and hash every eligible file in the directory.
    ///
    /// A file that cannot be read is reported in [`DirScan::unreadable`]
    /// instead of failing the scan. Only an unreadable directory is an error.
    pub fn scan(&self) -> Result<DirScan> {
        let entries = fs::read_dir(&self.root).map_err(|e| SyncError::local_io(&self.root, e))?;

        let mut scan = DirScan::default();
        for entry in entries {
            let entry = entry.map_err(|e| SyncError::local_io(&self.root, e))?;
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                warn!(path = %entry.path().display(), "skipping non UTF-8 filename");
                continue;
            };
            if !is_eligible(&name) {
                continue;
            }

            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(e) => {
                    scan.unreadable.push((name, SyncError::local_io(entry.path(), e)));
                    continue;
                }
            };
            if !file_type.is_file() {
                continue;
            }

            match self.read_blocks(&name) {
                Ok(blocks) => {
                    scan.files.insert(name, hash_list(&blocks));
                }
                Err(e) => {
                    warn!(file = %name, error = %e, "cannot read file");
                    scan.unreadable.push((name, e));
                }
            }
        }

        debug!(
            files = scan.files.len(),
            unreadable = scan.unreadable.len(),
            root = %self.root.display(),
            "scanned directory"
        );
        Ok(scan)
    }

    /// Read `name` and split it into blocks.
    pub fn read_blocks(&self, name: &str) -> Result<Vec<Block>> {
        let path = self.path_of(name);
        let file = fs::File::open(&path).map_err(|e| SyncError::local_io(&path, e))?;
        chunk_reader(io::BufReader::new(file), self.block_size)
            .map_err(|e| SyncError::local_io(&path, e))
    }

    /// Replace the content of `name` with the concatenation of `blocks`.
    pub fn write_file(&self, name: &str, blocks: &[Block]) -> Result<()> {
        let path = self.path_of(name);
        let write = || -> io::Result<()> {
            let mut file = io::BufWriter::new(fs::File::create(&path)?);
            for block in blocks {
                file.write_all(block.as_bytes())?;
            }
            file.flush()
        };
        write().map_err(|e| SyncError::local_io(&path, e))
    }

    /// Delete `name`. Returns `false` if it did not exist.
    pub fn remove_file(&self, name: &str) -> Result<bool> {
        let path = self.path_of(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SyncError::local_io(&path, e)),
        }
    }

    /// Load the index. A missing index is an empty base.
    pub fn load_index(&self) -> Result<Snapshot> {
        let path = self.path_of(INDEX_FILE_NAME);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(decode_index(&text)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Snapshot::new()),
            Err(e) => Err(SyncError::local_io(&path, e)),
        }
    }

    /// Write the index through a temporary file and rename it into place.
    pub fn persist_index(&self, snapshot: &Snapshot) -> Result<()> {
        let tmp = self.path_of(INDEX_TEMP_NAME);
        let path = self.path_of(INDEX_FILE_NAME);

        let text = encode_index(snapshot);
        let write = || -> io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(text.as_bytes())?;
            file.sync_all()
        };
        write().map_err(|e| SyncError::local_io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| SyncError::local_io(&path, e))
    }
}

/// Whether a directory entry with this name takes part in sync.
pub fn is_eligible(name: &str) -> bool {
    name != INDEX_FILE_NAME && !name.starts_with('.') && validate_filename(name).is_ok()
}
