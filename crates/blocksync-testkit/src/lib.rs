//! # Blocksync Testkit
//!
//! Testing utilities for blocksync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Fixed hashes, chunkings and index lines every client must reproduce
//! - **Generators**: Proptest strategies for contents, names, metadata and edits
//! - **Fixtures**: An in-memory server and temp-directory clients
//!
//! ## Golden Vectors
//!
//! ```rust
//! use blocksync_testkit::vectors::verify_all_vectors;
//!
//! assert!(verify_all_vectors().is_empty());
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use blocksync_core::{chunk_bytes, reassemble};
//! use blocksync_testkit::generators::{block_size, file_content};
//!
//! proptest! {
//!     #[test]
//!     fn chunks_reassemble(data in file_content(256), size in block_size()) {
//!         let blocks = chunk_bytes(&data, size).unwrap();
//!         prop_assert_eq!(reassemble(&blocks), data);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use blocksync_testkit::TestServer;
//!
//! async fn example() {
//!     let server = TestServer::new();
//!     let mut a = server.client(4);
//!     let mut b = server.client(4);
//!
//!     a.write("a.txt", b"abcdefgh");
//!     a.sync().await.unwrap();
//!     b.sync().await.unwrap();
//!     assert_eq!(b.read("a.txt").unwrap(), b"abcdefgh");
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{random_bytes, DirContents, TestClient, TestServer};
pub use generators::FileEdit;
pub use vectors::{chunk_vectors, hash_vectors, index_vectors, verify_all_vectors};
