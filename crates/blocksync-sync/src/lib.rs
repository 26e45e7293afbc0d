//! # Blocksync Sync
//!
//! The server's RPC surface and the client that reconciles a directory with it.
//!
//! ## Overview
//!
//! A [`SyncService`] answers [`Request`]s from any number of clients over a
//! [`Transport`]. Each client runs a [`SyncEngine`], which compares its last
//! agreed snapshot (the index), a fresh scan of its directory and the
//! server's map, then downloads, uploads, commits and deletes until the three
//! agree. Concurrent edits are detected by the server's compare-and-swap on
//! file versions; the server's version always wins.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use blocksync_store::MemoryStore;
//! use blocksync_sync::{LocalTransport, SyncEngine, SyncService};
//!
//! async fn example() {
//!     let service = Arc::new(SyncService::with_store(Arc::new(MemoryStore::new())));
//!
//!     let transport = LocalTransport::new(service);
//!     let mut engine = SyncEngine::new(transport, "/tmp/blocksync", 4096).unwrap();
//!
//!     let report = engine.sync().await.unwrap();
//!     println!("uploaded {} files", report.uploaded.len());
//! }
//! ```
//!
//! ## Message Flow
//!
//! ```text
//! Client                              Server
//!   |-------- GetFileInfoMap -------->|
//!   |<------- FileInfoMap ------------|
//!   |-------- GetBlock -------------->|   (download, per missing block)
//!   |<------- Block ------------------|
//!   |-------- HasBlocks ------------->|   (upload)
//!   |<------- Present ----------------|
//!   |-------- PutBlock -------------->|   (per missing block)
//!   |<------- Stored -----------------|
//!   |-------- UpdateFile ------------>|
//!   |<------- Updated ----------------|
//! ```

pub mod client;
pub mod engine;
pub mod error;
pub mod local;
pub mod messages;
pub mod service;
pub mod tcp;
pub mod transport;

pub use client::RpcClient;
pub use engine::{FileFailure, SyncEngine, SyncReport};
pub use error::{Result, SyncError};
pub use local::{is_eligible, DirScan, LocalDir, LocalScan};
pub use messages::{limits, ErrorCode, Request, Response};
pub use service::SyncService;
pub use tcp::{bind, read_frame, serve, write_frame, TcpTransport};
pub use transport::{memory::LocalTransport, Transport};
