//! # Blocksync
//!
//! Keeps directories on many machines in step with one server-held snapshot.
//!
//! ## Overview
//!
//! Files are split into fixed-size blocks addressed by their SHA-256 digest.
//! The server stores each distinct block once, and for every filename a
//! versioned list of block hashes (or a tombstone). Clients reconcile their
//! directory with the server in passes; the server accepts an update only
//! at exactly the next version, so concurrent edits are detected and the
//! server's copy wins.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use blocksync::{node, ClientConfig, ServerConfig};
//!
//! async fn example() -> blocksync::Result<()> {
//!     let server = ServerConfig::default();
//!     tokio::spawn(async move { node::run_server(&server, std::future::pending()).await });
//!
//!     let client = ClientConfig {
//!         base_dir: "/tmp/blocksync".into(),
//!         block_size: 4096,
//!         ..ClientConfig::default()
//!     };
//!     let report = node::sync_once(&client).await?;
//!     println!("downloaded {} files", report.downloaded.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `blocksync::core` - Blocks, hashes, metadata, chunking, index format
//! - `blocksync::store` - Block and metadata stores (memory, SQLite)
//! - `blocksync::sync` - Service, transports and the sync engine

pub mod config;
pub mod error;
pub mod node;

// Re-export component crates
pub use blocksync_core as core;
pub use blocksync_store as store;
pub use blocksync_sync as sync;

pub use config::{ClientConfig, ServerConfig, DEFAULT_ADDR, DEFAULT_BLOCK_SIZE};
pub use error::{BlocksyncError, Result};

pub use blocksync_core::{Block, BlockHash, FileContent, FileMetaData, Snapshot};
pub use blocksync_sync::{SyncEngine, SyncReport, SyncService};
