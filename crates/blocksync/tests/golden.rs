//! Golden vectors for hashes, chunking and the on-disk index.
//!
//! Every client talking to the same server must produce identical:
//! - block hashes (lowercase hex SHA-256)
//! - hash lists for a given block size
//! - index lines

use blocksync::core::{decode_index, encode_index, Snapshot, INDEX_FILE_NAME};
use blocksync_testkit::generators::file_metadata;
use blocksync_testkit::vectors::{index_vectors, ABCD_HEX, EFGH_HEX};
use blocksync_testkit::{verify_all_vectors, TestServer};
use proptest::prelude::*;

#[test]
fn test_all_vectors_hold() {
    let failures = verify_all_vectors();
    assert!(failures.is_empty(), "golden vector failures: {:#?}", failures);
}

#[test]
fn test_index_vectors_encode_as_a_file() {
    let snapshot = index_vectors()
        .iter()
        .filter(|v| v.filename != "a.txt" || v.hashes.is_none())
        .map(|v| (v.filename.to_string(), v.metadata()))
        .collect();

    assert_eq!(encode_index(&snapshot), "a.txt,2,0\nempty,3,\n");
}

#[tokio::test]
async fn test_persisted_index_matches_vector() {
    let server = TestServer::new();
    let mut client = server.client(4);
    client.write("a.txt", b"abcdefgh");
    client.sync().await.unwrap();

    let text = std::fs::read_to_string(client.file_path(INDEX_FILE_NAME)).unwrap();
    assert_eq!(text, format!("a.txt,1,{} {}\n", ABCD_HEX, EFGH_HEX));
}

proptest! {
    #[test]
    fn test_index_text_reloads(metas in prop::collection::vec(file_metadata(), 0..8)) {
        let snapshot: Snapshot = metas
            .into_iter()
            .map(|meta| (meta.filename.clone(), meta))
            .collect();
        let text = encode_index(&snapshot);
        prop_assert_eq!(decode_index(&text).unwrap(), snapshot);
    }
}
