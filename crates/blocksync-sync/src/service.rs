//! The server-side RPC surface.
//!
//! [`SyncService`] is the union of a [`BlockStore`] and a [`MetadataStore`].
//! It keeps no state of its own beyond the size ceiling; every call is
//! delegated to the stores, which provide the locking.

use std::sync::Arc;

use blocksync_core::{Block, BlockHash, FileMetaData, Snapshot};
use blocksync_store::{BlockStore, MetadataStore, StoreError, UpdateOutcome};
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::local::is_eligible;
use crate::messages::{limits, ErrorCode, Request, Response};

/// Block and metadata service shared by all connected clients.
pub struct SyncService {
    blocks: Arc<dyn BlockStore>,
    meta: Arc<dyn MetadataStore>,
    max_block_size: usize,
}

impl SyncService {
    /// Create a service over separate block and metadata stores.
    pub fn new(blocks: Arc<dyn BlockStore>, meta: Arc<dyn MetadataStore>) -> Self {
        Self {
            blocks,
            meta,
            max_block_size: limits::DEFAULT_MAX_BLOCK_SIZE,
        }
    }

    /// Create a service over one store that implements both traits.
    pub fn with_store<S>(store: Arc<S>) -> Self
    where
        S: BlockStore + MetadataStore + 'static,
    {
        let blocks: Arc<dyn BlockStore> = store.clone();
        let meta: Arc<dyn MetadataStore> = store;
        Self::new(blocks, meta)
    }

    /// Set the largest block `put_block` will accept.
    pub fn max_block_size(mut self, max: usize) -> Self {
        self.max_block_size = max;
        self
    }

    pub async fn get_file_info_map(&self) -> Result<Snapshot> {
        Ok(self.meta.get_file_info_map().await?)
    }

    /// Compare-and-swap `candidate` into the metadata map.
    ///
    /// Names a client's scan would never pick up (the index file, hidden
    /// files) are refused.
    pub async fn update_file(&self, candidate: &FileMetaData) -> Result<UpdateOutcome> {
        if !is_eligible(&candidate.filename) {
            return Err(SyncError::InvalidRequest(format!(
                "filename {:?} is not syncable",
                candidate.filename
            )));
        }
        let outcome = self.meta.update_file(candidate).await?;
        if outcome.accepted {
            info!(
                file = %candidate.filename,
                version = candidate.version,
                tombstone = candidate.is_tombstone(),
                "accepted update"
            );
        } else {
            debug!(
                file = %candidate.filename,
                attempted = candidate.version,
                current = outcome.current_version,
                "rejected stale update"
            );
        }
        Ok(outcome)
    }

    pub async fn get_block(&self, hash: &BlockHash) -> Result<Block> {
        match self.blocks.get_block(hash).await {
            Ok(block) => Ok(block),
            Err(StoreError::BlockNotFound(hash)) => Err(SyncError::BlockNotFound(hash)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn put_block(&self, block: &Block) -> Result<BlockHash> {
        if block.len() > self.max_block_size {
            return Err(SyncError::BlockTooLarge {
                size: block.len(),
                max: self.max_block_size,
            });
        }
        Ok(self.blocks.put_block(block).await?)
    }

    pub async fn has_blocks(&self, hashes: &[BlockHash]) -> Result<Vec<BlockHash>> {
        if hashes.len() > limits::MAX_HAS_BLOCKS {
            return Err(SyncError::InvalidRequest(format!(
                "{} hashes exceeds the limit of {}",
                hashes.len(),
                limits::MAX_HAS_BLOCKS
            )));
        }
        Ok(self.blocks.has_blocks(hashes).await?)
    }

    /// Answer one request. Never fails: errors become [`Response::Error`].
    pub async fn handle(&self, request: Request) -> Response {
        let name = request.name();
        let result = match request {
            Request::GetFileInfoMap => self.get_file_info_map().await.map(Response::FileInfoMap),
            Request::UpdateFile(meta) => self.update_file(&meta).await.map(Response::Updated),
            Request::GetBlock(hash) => self.get_block(&hash).await.map(Response::Block),
            Request::PutBlock(block) => self.put_block(&block).await.map(Response::Stored),
            Request::HasBlocks(hashes) => self.has_blocks(&hashes).await.map(Response::Present),
        };

        result.unwrap_or_else(|e| {
            let code = error_code(&e);
            if code == ErrorCode::Internal {
                warn!(request = name, error = %e, "request failed");
            } else {
                debug!(request = name, error = %e, "request refused");
            }
            Response::Error {
                code,
                message: e.to_string(),
            }
        })
    }
}

fn error_code(e: &SyncError) -> ErrorCode {
    match e {
        SyncError::BlockNotFound(_) => ErrorCode::NotFound,
        SyncError::BlockTooLarge { .. } | SyncError::FrameTooLarge { .. } => ErrorCode::TooLarge,
        SyncError::InvalidRequest(_)
        | SyncError::StoreError(StoreError::InvalidData(_))
        | SyncError::Core(_) => ErrorCode::InvalidRequest,
        SyncError::Remote { code, .. } => *code,
        _ => ErrorCode::Internal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocksync_store::MemoryStore;

    fn service() -> SyncService {
        SyncService::with_store(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let service = service();
        let block = Block::new(b"abcd".to_vec());

        let stored = service.handle(Request::PutBlock(block.clone())).await;
        assert_eq!(stored, Response::Stored(BlockHash::digest(b"abcd")));

        let fetched = service
            .handle(Request::GetBlock(BlockHash::digest(b"abcd")))
            .await;
        assert_eq!(fetched, Response::Block(block));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let service = service();
        let response = service
            .handle(Request::GetBlock(BlockHash::digest(b"missing")))
            .await;
        assert!(matches!(
            response,
            Response::Error {
                code: ErrorCode::NotFound,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_block_size_ceiling() {
        let service = service().max_block_size(4);
        let response = service
            .handle(Request::PutBlock(Block::new(b"abcde".to_vec())))
            .await;
        assert!(matches!(
            response,
            Response::Error {
                code: ErrorCode::TooLarge,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_update_file_reports_current_version() {
        let service = service();
        let v1 = FileMetaData::live("a.txt", 1, vec![]);

        assert_eq!(
            service.handle(Request::UpdateFile(v1.clone())).await,
            Response::Updated(UpdateOutcome::accepted(1))
        );
        assert_eq!(
            service.handle(Request::UpdateFile(v1)).await,
            Response::Updated(UpdateOutcome::rejected(1))
        );

        match service.handle(Request::GetFileInfoMap).await {
            Response::FileInfoMap(map) => assert_eq!(map["a.txt"].version, 1),
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_filename_is_invalid_request() {
        let service = service();
        let response = service
            .handle(Request::UpdateFile(FileMetaData::live("a/b", 1, vec![])))
            .await;
        assert!(matches!(
            response,
            Response::Error {
                code: ErrorCode::InvalidRequest,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unsyncable_names_are_refused() {
        let service = service();
        for name in ["index.txt", ".hidden"] {
            let response = service
                .handle(Request::UpdateFile(FileMetaData::live(name, 1, vec![])))
                .await;
            assert!(
                matches!(
                    response,
                    Response::Error {
                        code: ErrorCode::InvalidRequest,
                        ..
                    }
                ),
                "{} was accepted",
                name
            );
        }
        assert!(service.get_file_info_map().await.unwrap().is_empty());
    }
}
