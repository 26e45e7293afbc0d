//! Golden vectors for block hashing and the index format.
//!
//! Any client of a blocksync server must produce these exact hashes and
//! index lines, or the server will see its files as different content.

use blocksync_core::{
    chunk_bytes, decode_record, encode_record, hash_list, BlockHash, FileMetaData,
};

/// A known block and its SHA-256 hex digest.
#[derive(Debug, Clone)]
pub struct HashVector {
    pub name: &'static str,
    pub data: &'static [u8],
    pub expected_hex: &'static str,
}

/// A file, a block size and the hash list it must chunk to.
#[derive(Debug, Clone)]
pub struct ChunkVector {
    pub name: &'static str,
    pub content: &'static [u8],
    pub block_size: usize,
    pub expected_hashes: &'static [&'static str],
}

/// An index line and the metadata it encodes.
#[derive(Debug, Clone)]
pub struct IndexVector {
    pub name: &'static str,
    pub line: &'static str,
    pub filename: &'static str,
    pub version: u64,
    /// `None` for a tombstone.
    pub hashes: Option<&'static [&'static str]>,
}

pub const ABCD_HEX: &str = "88d4266fd4e6338d13b845fcf289579d209c897823b9217da3e161936f031589";
pub const EFGH_HEX: &str = "e5e088a0b66163a0a26a5e053d2a4496dc16ab6e0e3dd1adf2d16aa84a078c9d";
pub const EMPTY_HEX: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
pub const ABCDEFGH_HEX: &str = "9c56cc51b374c3ba189210d5b6d4bf57790d351c96c47c02190ecf1e430635ab";

pub fn hash_vectors() -> Vec<HashVector> {
    vec![
        HashVector {
            name: "abcd",
            data: b"abcd",
            expected_hex: ABCD_HEX,
        },
        HashVector {
            name: "efgh",
            data: b"efgh",
            expected_hex: EFGH_HEX,
        },
        HashVector {
            name: "empty",
            data: b"",
            expected_hex: EMPTY_HEX,
        },
        HashVector {
            name: "abcdefgh",
            data: b"abcdefgh",
            expected_hex: ABCDEFGH_HEX,
        },
    ]
}

pub fn chunk_vectors() -> Vec<ChunkVector> {
    vec![
        ChunkVector {
            name: "two full blocks",
            content: b"abcdefgh",
            block_size: 4,
            expected_hashes: &[ABCD_HEX, EFGH_HEX],
        },
        ChunkVector {
            name: "single block larger than file",
            content: b"abcdefgh",
            block_size: 4096,
            expected_hashes: &[ABCDEFGH_HEX],
        },
        ChunkVector {
            name: "empty file",
            content: b"",
            block_size: 4,
            expected_hashes: &[],
        },
    ]
}

pub fn index_vectors() -> Vec<IndexVector> {
    vec![
        IndexVector {
            name: "live file",
            line: "a.txt,1,88d4266fd4e6338d13b845fcf289579d209c897823b9217da3e161936f031589 e5e088a0b66163a0a26a5e053d2a4496dc16ab6e0e3dd1adf2d16aa84a078c9d",
            filename: "a.txt",
            version: 1,
            hashes: Some(&[ABCD_HEX, EFGH_HEX]),
        },
        IndexVector {
            name: "tombstone",
            line: "a.txt,2,0",
            filename: "a.txt",
            version: 2,
            hashes: None,
        },
        IndexVector {
            name: "empty file",
            line: "empty,3,",
            filename: "empty",
            version: 3,
            hashes: Some(&[]),
        },
    ]
}

impl IndexVector {
    /// The metadata this line encodes.
    pub fn metadata(&self) -> FileMetaData {
        match self.hashes {
            Some(hexes) => FileMetaData::live(self.filename, self.version, parse_hashes(hexes)),
            None => FileMetaData::tombstone(self.filename, self.version),
        }
    }
}

fn parse_hashes(hexes: &[&str]) -> Vec<BlockHash> {
    hexes
        .iter()
        .map(|h| BlockHash::from_hex(h).expect("golden hash is valid hex"))
        .collect()
}

/// Check every vector. Returns a description of each mismatch.
pub fn verify_all_vectors() -> Vec<String> {
    let mut failures = Vec::new();

    for v in hash_vectors() {
        let got = BlockHash::digest(v.data);
        if got.as_str() != v.expected_hex {
            failures.push(format!("hash {}: got {}", v.name, got));
        }
        if hex::encode(hex::decode(v.expected_hex).unwrap_or_default()) != v.expected_hex {
            failures.push(format!("hash {}: expected value is not hex", v.name));
        }
    }

    for v in chunk_vectors() {
        let got = match chunk_bytes(v.content, v.block_size) {
            Ok(blocks) => hash_list(&blocks),
            Err(e) => {
                failures.push(format!("chunk {}: {}", v.name, e));
                continue;
            }
        };
        if got != parse_hashes(v.expected_hashes) {
            failures.push(format!("chunk {}: got {:?}", v.name, got));
        }
    }

    for v in index_vectors() {
        let expected = v.metadata();
        if encode_record(&expected) != v.line {
            failures.push(format!("index {}: encoded {}", v.name, encode_record(&expected)));
        }
        match decode_record(v.line, 1) {
            Ok(decoded) if decoded == expected => {}
            Ok(decoded) => failures.push(format!("index {}: decoded {:?}", v.name, decoded)),
            Err(e) => failures.push(format!("index {}: {}", v.name, e)),
        }
    }

    failures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_pass() {
        let failures = verify_all_vectors();
        assert!(failures.is_empty(), "failures: {:#?}", failures);
    }
}
