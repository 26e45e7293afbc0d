//! Entry points that turn a config into a running server or a sync pass.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use blocksync_core::Snapshot;
use blocksync_store::{MemoryStore, SqliteStore};
use blocksync_sync::{tcp, LocalDir, SyncEngine, SyncReport, SyncService, TcpTransport};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::{ClientConfig, ServerConfig};
use crate::error::Result;

/// Build the service described by `config`.
pub fn open_service(config: &ServerConfig) -> Result<SyncService> {
    config.validate()?;
    let service = match &config.database {
        Some(path) => {
            info!(database = %path.display(), "opening sqlite store");
            SyncService::with_store(Arc::new(SqliteStore::open(path)?))
        }
        None => {
            info!("using in-memory store");
            SyncService::with_store(Arc::new(MemoryStore::new()))
        }
    };
    Ok(service.max_block_size(config.max_block_size))
}

/// Serve on `listener` until `shutdown` resolves.
pub async fn serve_on<F>(listener: TcpListener, config: &ServerConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let service = Arc::new(open_service(config)?);
    tcp::serve(listener, service, shutdown).await?;
    Ok(())
}

/// Bind the configured address and serve until `shutdown` resolves.
pub async fn run_server<F>(config: &ServerConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let (listener, _) = tcp::bind(&config.listen_addr).await?;
    serve_on(listener, config, shutdown).await
}

/// Run one sync pass of `config.base_dir` against `config.server_addr`.
pub async fn sync_once(config: &ClientConfig) -> Result<SyncReport> {
    config.validate()?;
    let transport = TcpTransport::new(config.server_addr.clone());
    let mut engine = SyncEngine::new(transport, &config.base_dir, config.block_size)?;
    Ok(engine.sync().await?)
}

/// Read the index of a synced directory.
pub fn read_index(base_dir: impl AsRef<Path>) -> Result<Snapshot> {
    // The block size plays no part in reading the index.
    let local = LocalDir::new(base_dir.as_ref(), 1)?;
    Ok(local.load_index()?)
}
