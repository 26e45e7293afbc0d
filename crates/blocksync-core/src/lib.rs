//! # Blocksync Core
//!
//! Pure primitives for blocksync: content-addressed blocks, versioned file
//! metadata, fixed-size chunking and the text encoding of the local index.
//!
//! This crate contains no networking and no storage. The only I/O it performs
//! is reading from a caller-supplied [`std::io::Read`] while chunking.
//!
//! ## Key Types
//!
//! - [`Block`] - An immutable chunk of file bytes
//! - [`BlockHash`] - Content address of a block (hex SHA-256)
//! - [`FileMetaData`] - Filename, version and [`FileContent`]
//! - [`Snapshot`] - Filename to metadata map (base, current or remote)
//!
//! ## Chunking
//!
//! Files are split into consecutive windows of `block_size` bytes. See the
//! [`chunk`] module.

pub mod chunk;
pub mod error;
pub mod hash;
pub mod index;
pub mod types;

pub use chunk::{chunk_bytes, chunk_reader, hash_list, reassemble, Chunker};
pub use error::{CoreError, Result};
pub use hash::{BlockHash, TOMBSTONE_HASH};
pub use index::{decode_index, decode_record, encode_index, encode_record, INDEX_FILE_NAME};
pub use types::{validate_filename, Block, FileContent, FileMetaData, Snapshot};
