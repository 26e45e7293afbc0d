//! RPC message types.
//!
//! Every request receives exactly one response. Failures travel as
//! [`Response::Error`] with a machine-readable [`ErrorCode`].

use serde::{Deserialize, Serialize};

use blocksync_core::{Block, BlockHash, FileMetaData, Snapshot};
use blocksync_store::UpdateOutcome;

/// Size limits applied by the service and the TCP transport.
pub mod limits {
    /// Largest encoded frame accepted on the wire.
    pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;
    /// Default ceiling on a single stored block.
    pub const DEFAULT_MAX_BLOCK_SIZE: usize = 16 * 1024 * 1024;
    /// Max hashes in a single HasBlocks request.
    pub const MAX_HAS_BLOCKS: usize = 100_000;
}

/// Client to server requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Fetch the whole filename to metadata map.
    GetFileInfoMap,
    /// Compare-and-swap a file's metadata.
    UpdateFile(FileMetaData),
    /// Fetch one block by hash.
    GetBlock(BlockHash),
    /// Store one block.
    PutBlock(Block),
    /// Ask which of these hashes are stored.
    HasBlocks(Vec<BlockHash>),
}

impl Request {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Request::GetFileInfoMap => "GetFileInfoMap",
            Request::UpdateFile(_) => "UpdateFile",
            Request::GetBlock(_) => "GetBlock",
            Request::PutBlock(_) => "PutBlock",
            Request::HasBlocks(_) => "HasBlocks",
        }
    }
}

/// Server to client responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    FileInfoMap(Snapshot),
    Updated(UpdateOutcome),
    Block(Block),
    Stored(BlockHash),
    Present(Vec<BlockHash>),
    Error { code: ErrorCode, message: String },
}

impl Response {
    /// Short name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Response::FileInfoMap(_) => "FileInfoMap",
            Response::Updated(_) => "Updated",
            Response::Block(_) => "Block",
            Response::Stored(_) => "Stored",
            Response::Present(_) => "Present",
            Response::Error { .. } => "Error",
        }
    }
}

/// Error codes carried by [`Response::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Requested block is not stored.
    NotFound,
    /// Request was malformed or violated a limit.
    InvalidRequest,
    /// Block or message too large.
    TooLarge,
    /// Storage failure on the server.
    Internal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cbor_roundtrip<T: Serialize + serde::de::DeserializeOwned>(value: &T) -> T {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf).unwrap();
        ciborium::from_reader(&buf[..]).unwrap()
    }

    #[test]
    fn test_tombstone_survives_the_wire() {
        let request = Request::UpdateFile(FileMetaData::tombstone("a.txt", 2));
        assert_eq!(cbor_roundtrip(&request), request);
    }

    #[test]
    fn test_block_encodes_as_byte_string() {
        let block = Block::new(vec![0xffu8; 1024]);
        let mut buf = Vec::new();
        ciborium::into_writer(&Request::PutBlock(block), &mut buf).unwrap();
        // As an integer array each 0xff would take two bytes.
        assert!(buf.len() < 1100, "encoded size {}", buf.len());
    }

    #[test]
    fn test_error_response_roundtrip() {
        let response = Response::Error {
            code: ErrorCode::NotFound,
            message: "block not found".into(),
        };
        assert_eq!(cbor_roundtrip(&response), response);
    }
}
