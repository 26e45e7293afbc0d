//! Typed client over a [`Transport`].

use std::time::Duration;

use blocksync_core::{Block, BlockHash, FileMetaData, Snapshot};
use blocksync_store::UpdateOutcome;
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::messages::{limits, ErrorCode, Request, Response};
use crate::transport::Transport;

/// Wraps a transport with one typed method per RPC.
pub struct RpcClient<T: Transport> {
    transport: T,
    timeout: Option<Duration>,
}

impl<T: Transport> RpcClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            timeout: None,
        }
    }

    /// Bound every request by `timeout`. Requests wait indefinitely otherwise.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn call(&self, request: Request) -> Result<Response> {
        let name = request.name();
        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.transport.call(request))
                .await
                .map_err(|_| SyncError::Timeout {
                    request: name,
                    elapsed: limit,
                })??,
            None => self.transport.call(request).await?,
        };

        match response {
            Response::Error { code, message } => Err(SyncError::Remote { code, message }),
            other => Ok(other),
        }
    }

    pub async fn get_file_info_map(&self) -> Result<Snapshot> {
        match self.call(Request::GetFileInfoMap).await? {
            Response::FileInfoMap(map) => Ok(map),
            other => Err(unexpected("FileInfoMap", &other)),
        }
    }

    /// Attempt a compare-and-swap update. A rejection is not an error here.
    pub async fn update_file(&self, meta: &FileMetaData) -> Result<UpdateOutcome> {
        match self.call(Request::UpdateFile(meta.clone())).await? {
            Response::Updated(outcome) => Ok(outcome),
            other => Err(unexpected("Updated", &other)),
        }
    }

    /// Fetch a block and check that it hashes to `hash`.
    pub async fn get_block(&self, hash: &BlockHash) -> Result<Block> {
        let response = match self.call(Request::GetBlock(hash.clone())).await {
            Err(SyncError::Remote {
                code: ErrorCode::NotFound,
                ..
            }) => return Err(SyncError::BlockNotFound(hash.clone())),
            other => other?,
        };
        match response {
            Response::Block(block) => {
                hash.verify(block.as_bytes())?;
                Ok(block)
            }
            other => Err(unexpected("Block", &other)),
        }
    }

    pub async fn put_block(&self, block: &Block) -> Result<BlockHash> {
        match self.call(Request::PutBlock(block.clone())).await? {
            Response::Stored(hash) => Ok(hash),
            other => Err(unexpected("Stored", &other)),
        }
    }

    pub async fn has_blocks(&self, hashes: &[BlockHash]) -> Result<Vec<BlockHash>> {
        let mut present = Vec::new();
        for batch in hashes.chunks(limits::MAX_HAS_BLOCKS) {
            match self.call(Request::HasBlocks(batch.to_vec())).await? {
                Response::Present(found) => present.extend(found),
                other => return Err(unexpected("Present", &other)),
            }
        }
        Ok(present)
    }

    /// Store every block the server does not already have.
    ///
    /// Returns the number of blocks sent.
    pub async fn upload_missing(&self, blocks: &[Block]) -> Result<usize> {
        if blocks.is_empty() {
            return Ok(0);
        }

        let hashes: Vec<BlockHash> = blocks.iter().map(Block::hash).collect();
        let present: std::collections::HashSet<BlockHash> =
            self.has_blocks(&hashes).await?.into_iter().collect();

        let mut sent = std::collections::HashSet::new();
        for (block, hash) in blocks.iter().zip(&hashes) {
            if present.contains(hash) || !sent.insert(hash) {
                continue;
            }
            self.put_block(block).await?;
        }
        debug!(
            total = blocks.len(),
            sent = sent.len(),
            "uploaded missing blocks"
        );
        Ok(sent.len())
    }
}

fn unexpected(expected: &'static str, got: &Response) -> SyncError {
    SyncError::UnexpectedResponse {
        expected,
        got: got.name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::SyncService;
    use crate::transport::memory::LocalTransport;
    use async_trait::async_trait;
    use blocksync_store::MemoryStore;
    use std::sync::Arc;

    fn client() -> (RpcClient<LocalTransport>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = Arc::new(SyncService::with_store(Arc::clone(&store)));
        (RpcClient::new(LocalTransport::new(service)), store)
    }

    /// Answers every request with the same response.
    struct Fixed(Response);

    #[async_trait]
    impl Transport for Fixed {
        async fn call(&self, _request: Request) -> Result<Response> {
            Ok(self.0.clone())
        }
    }

    /// Never answers.
    struct Silent;

    #[async_trait]
    impl Transport for Silent {
        async fn call(&self, _request: Request) -> Result<Response> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_upload_missing_skips_present_and_duplicates() {
        let (client, store) = client();
        client.put_block(&Block::new(b"abcd".to_vec())).await.unwrap();

        let blocks = vec![
            Block::new(b"abcd".to_vec()),
            Block::new(b"efgh".to_vec()),
            Block::new(b"efgh".to_vec()),
        ];
        let sent = client.upload_missing(&blocks).await.unwrap();

        assert_eq!(sent, 1);
        assert_eq!(store.block_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_missing_block_maps_to_block_not_found() {
        let (client, _) = client();
        let hash = BlockHash::digest(b"nowhere");
        let err = client.get_block(&hash).await.unwrap_err();
        assert!(matches!(err, SyncError::BlockNotFound(h) if h == hash));
    }

    #[tokio::test]
    async fn test_get_block_verifies_content() {
        let client = RpcClient::new(Fixed(Response::Block(Block::new(b"forged".to_vec()))));
        let err = client
            .get_block(&BlockHash::digest(b"abcd"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Core(_)));
    }

    #[tokio::test]
    async fn test_wrong_response_kind() {
        let client = RpcClient::new(Fixed(Response::Present(vec![])));
        let err = client.get_file_info_map().await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::UnexpectedResponse {
                expected: "FileInfoMap",
                got: "Present"
            }
        ));
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let client = RpcClient::new(Silent).with_timeout(Duration::from_millis(20));
        let err = client.get_file_info_map().await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Timeout {
                request: "GetFileInfoMap",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_rejected_update_is_not_an_error() {
        let (client, _) = client();
        let v1 = FileMetaData::live("a.txt", 1, vec![]);
        assert!(client.update_file(&v1).await.unwrap().accepted);

        let outcome = client.update_file(&v1).await.unwrap();
        assert!(!outcome.accepted);
        assert_eq!(outcome.current_version, 1);
    }
}
