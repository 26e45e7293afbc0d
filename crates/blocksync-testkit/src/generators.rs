//! Proptest generators for property-based testing.

use std::collections::BTreeMap;

use proptest::prelude::*;

use blocksync_core::{BlockHash, FileMetaData};

/// File content up to `max_len` bytes, including empty.
pub fn file_content(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// A block size small enough to force multi-block files in tests.
pub fn block_size() -> impl Strategy<Value = usize> {
    1usize..=64
}

/// A filename the scan accepts.
pub fn filename() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}\\.txt"
}

/// The hash of arbitrary bytes.
pub fn block_hash() -> impl Strategy<Value = BlockHash> {
    any::<[u8; 16]>().prop_map(|seed| BlockHash::digest(&seed))
}

/// Metadata for a live file or a tombstone.
pub fn file_metadata() -> impl Strategy<Value = FileMetaData> {
    (
        filename(),
        1u64..1_000,
        prop::option::of(prop::collection::vec(block_hash(), 0..8)),
    )
        .prop_map(|(name, version, hashes)| match hashes {
            Some(hashes) => FileMetaData::live(name, version, hashes),
            None => FileMetaData::tombstone(name, version),
        })
}

/// A flat directory: filename to content.
pub fn directory(max_files: usize, max_len: usize) -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    prop::collection::btree_map(filename(), file_content(max_len), 0..=max_files)
}

/// One change a user makes to a synced directory.
#[derive(Debug, Clone)]
pub enum FileEdit {
    Write { name: String, content: Vec<u8> },
    Remove { name: String },
}

/// A change to one of a small fixed set of names, so edits collide.
pub fn file_edit(max_len: usize) -> impl Strategy<Value = FileEdit> {
    let name = prop::sample::select(vec!["a.txt", "b.txt", "c.txt"]).prop_map(String::from);
    prop_oneof![
        3 => (name.clone(), file_content(max_len))
            .prop_map(|(name, content)| FileEdit::Write { name, content }),
        1 => name.prop_map(|name| FileEdit::Remove { name }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocksync_core::validate_filename;

    proptest! {
        #[test]
        fn filenames_are_valid(name in filename()) {
            prop_assert!(validate_filename(&name).is_ok());
            prop_assert!(!name.starts_with('.'));
        }

        #[test]
        fn metadata_is_valid(meta in file_metadata()) {
            prop_assert!(meta.validate().is_ok());
        }
    }
}
