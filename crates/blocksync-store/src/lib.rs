//! # Blocksync Store
//!
//! Server-side storage for blocksync. Provides trait-based interfaces for the
//! content-addressed block map and the versioned metadata map, with SQLite and
//! in-memory implementations.
//!
//! ## Key Types
//!
//! - [`BlockStore`] - Content-addressed block storage
//! - [`MetadataStore`] - Filename to [`FileMetaData`](blocksync_core::FileMetaData)
//!   with compare-and-swap updates
//! - [`MemoryStore`] - In-memory implementation of both traits
//! - [`SqliteStore`] - Persistent implementation of both traits
//! - [`UpdateOutcome`] - Result of a compare-and-swap update
//!
//! ## Usage
//!
//! ```rust,no_run
//! use blocksync_core::{Block, FileMetaData};
//! use blocksync_store::{BlockStore, MetadataStore, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("blocksync.db").unwrap();
//!
//!     let hash = store.put_block(&Block::new(b"abcd".to_vec())).await.unwrap();
//!     let outcome = store
//!         .update_file(&FileMetaData::live("a.txt", 1, vec![hash]))
//!         .await
//!         .unwrap();
//!     assert!(outcome.accepted);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent puts**: Storing the same block twice leaves one entry
//! - **Compare-and-swap**: A metadata update is accepted only at exactly
//!   `stored_version + 1` (or 1 for a new file); the check and the write happen
//!   under one lock or one transaction
//! - **Append-only blocks**: Blocks are never deleted

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{accepts_version, BlockStore, MetadataStore, UpdateOutcome};
