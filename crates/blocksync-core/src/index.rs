//! Text encoding of the persisted base snapshot.
//!
//! One record per line: `filename,version,h1 h2 ... hn`. A deleted file is
//! written with the hash list `0`; an empty file has an empty hash list.
//! Blank lines are ignored on decode.

use crate::error::{CoreError, Result};
use crate::hash::{BlockHash, TOMBSTONE_HASH};
use crate::types::{validate_filename, FileContent, FileMetaData, Snapshot};

/// Name of the index file inside a synced directory.
pub const INDEX_FILE_NAME: &str = "index.txt";

/// Encode one record, without the trailing newline.
pub fn encode_record(meta: &FileMetaData) -> String {
    let hashes = match &meta.content {
        FileContent::Tombstone => TOMBSTONE_HASH.to_string(),
        FileContent::Live(hashes) => hashes
            .iter()
            .map(BlockHash::as_str)
            .collect::<Vec<_>>()
            .join(" "),
    };
    format!("{},{},{}", meta.filename, meta.version, hashes)
}

/// Decode one record. `line_no` is only used in error messages.
pub fn decode_record(line: &str, line_no: usize) -> Result<FileMetaData> {
    let malformed = |reason: String| CoreError::MalformedIndex {
        line: line_no,
        reason,
    };

    let mut fields = line.splitn(3, ',');
    let (filename, version, hashes) = match (fields.next(), fields.next(), fields.next()) {
        (Some(f), Some(v), Some(h)) => (f, v, h),
        _ => return Err(malformed("expected 3 comma-separated fields".into())),
    };

    validate_filename(filename).map_err(|e| malformed(e.to_string()))?;

    let version: u64 = version
        .trim()
        .parse()
        .map_err(|e| malformed(format!("bad version {version:?}: {e}")))?;
    if version == 0 {
        return Err(malformed("version must be at least 1".into()));
    }

    let hashes = hashes.trim();
    let content = if hashes == TOMBSTONE_HASH {
        FileContent::Tombstone
    } else {
        let list = hashes
            .split_whitespace()
            .map(BlockHash::from_hex)
            .collect::<Result<Vec<_>>>()
            .map_err(|e| malformed(e.to_string()))?;
        FileContent::Live(list)
    };

    Ok(FileMetaData {
        filename: filename.to_string(),
        version,
        content,
    })
}

/// Encode a whole snapshot, one newline-terminated record per file.
pub fn encode_index(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for meta in snapshot.values() {
        out.push_str(&encode_record(meta));
        out.push('\n');
    }
    out
}

/// Decode an index file body.
pub fn decode_index(text: &str) -> Result<Snapshot> {
    let mut snapshot = Snapshot::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let meta = decode_record(line, i + 1)?;
        if snapshot.contains_key(&meta.filename) {
            return Err(CoreError::MalformedIndex {
                line: i + 1,
                reason: format!("duplicate record for {}", meta.filename),
            });
        }
        snapshot.insert(meta.filename.clone(), meta);
    }
    Ok(snapshot)
}
