//! Transport abstraction for the RPC surface.
//!
//! A transport delivers one [`Request`] and returns the matching
//! [`Response`]. Implementations may use TCP (see [`crate::tcp`]) or call a
//! service in the same process.

use async_trait::async_trait;

use crate::error::Result;
use crate::messages::{Request, Response};

/// Request/response transport.
///
/// Implementations must be thread-safe (Send + Sync). Calls are synchronous
/// from the caller's point of view: one response per request, in order.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and wait for its response.
    async fn call(&self, request: Request) -> Result<Response>;
}

/// An in-process transport.
///
/// Dispatches straight into a shared [`SyncService`](crate::SyncService), so
/// several clients built on clones of the same service see one server.
pub mod memory {
    use super::*;
    use std::sync::Arc;

    use crate::service::SyncService;

    /// In-memory transport implementation.
    #[derive(Clone)]
    pub struct LocalTransport {
        service: Arc<SyncService>,
    }

    impl LocalTransport {
        /// Create a transport talking to `service`.
        pub fn new(service: Arc<SyncService>) -> Self {
            Self { service }
        }

        /// The service behind this transport.
        pub fn service(&self) -> &Arc<SyncService> {
            &self.service
        }
    }

    #[async_trait]
    impl Transport for LocalTransport {
        async fn call(&self, request: Request) -> Result<Response> {
            Ok(self.service.handle(request).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::LocalTransport;
    use super::*;
    use crate::service::SyncService;
    use blocksync_core::{Block, BlockHash};
    use blocksync_store::MemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_local_transports_share_a_service() {
        let service = Arc::new(SyncService::with_store(Arc::new(MemoryStore::new())));
        let a = LocalTransport::new(Arc::clone(&service));
        let b = LocalTransport::new(service);

        a.call(Request::PutBlock(Block::new(b"shared".to_vec())))
            .await
            .unwrap();

        let response = b
            .call(Request::HasBlocks(vec![BlockHash::digest(b"shared")]))
            .await
            .unwrap();
        assert_eq!(
            response,
            Response::Present(vec![BlockHash::digest(b"shared")])
        );
    }
}
