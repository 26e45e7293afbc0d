//! Test fixtures and helpers.
//!
//! A [`TestServer`] holds an in-memory service; each [`TestClient`] owns a
//! temporary directory and an engine wired to that service in-process.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::RngCore;
use tempfile::TempDir;

use blocksync_core::Snapshot;
use blocksync_store::{MemoryStore, MetadataStore};
use blocksync_sync::{LocalTransport, Result, SyncEngine, SyncReport, SyncService};

use crate::generators::FileEdit;

/// An in-memory server shared by any number of clients.
pub struct TestServer {
    pub store: Arc<MemoryStore>,
    pub service: Arc<SyncService>,
}

impl TestServer {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let service = Arc::new(SyncService::with_store(Arc::clone(&store)));
        Self { store, service }
    }

    /// Create a client with a fresh empty directory.
    pub fn client(&self, block_size: usize) -> TestClient {
        TestClient::new(Arc::clone(&self.service), block_size)
    }

    /// The server's metadata map.
    pub async fn remote(&self) -> Snapshot {
        self.store
            .get_file_info_map()
            .await
            .expect("memory store never fails")
    }

    pub fn block_count(&self) -> usize {
        self.store.block_count().expect("memory store never fails")
    }
}

impl Default for TestServer {
    fn default() -> Self {
        Self::new()
    }
}

/// A client directory plus its engine.
pub struct TestClient {
    dir: TempDir,
    engine: SyncEngine<LocalTransport>,
}

impl TestClient {
    pub fn new(service: Arc<SyncService>, block_size: usize) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let engine = SyncEngine::new(LocalTransport::new(service), dir.path(), block_size)
            .expect("block size must be non-zero");
        Self { dir, engine }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, content: &[u8]) {
        fs::write(self.file_path(name), content).expect("failed to write test file");
    }

    /// Content of `name`, or `None` if it does not exist.
    pub fn read(&self, name: &str) -> Option<Vec<u8>> {
        match fs::read(self.file_path(name)) {
            Ok(data) => Some(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => panic!("failed to read {}: {}", name, e),
        }
    }

    pub fn remove(&self, name: &str) {
        fs::remove_file(self.file_path(name)).expect("failed to remove test file");
    }

    pub fn exists(&self, name: &str) -> bool {
        self.file_path(name).exists()
    }

    pub fn apply(&self, edit: &FileEdit) {
        match edit {
            FileEdit::Write { name, content } => self.write(name, content),
            FileEdit::Remove { name } => {
                if self.exists(name) {
                    self.remove(name);
                }
            }
        }
    }

    /// Run one sync pass.
    pub async fn sync(&mut self) -> Result<SyncReport> {
        self.engine.sync().await
    }

    /// The persisted index.
    pub fn index(&self) -> Snapshot {
        self.engine
            .local()
            .load_index()
            .expect("index must be readable")
    }

    /// Every synced file and its content, index excluded.
    pub fn contents(&self) -> DirContents {
        let scan = self.engine.local().scan().expect("scan failed");
        scan.files
            .keys()
            .map(|name| (name.clone(), self.read(name).unwrap_or_default()))
            .collect()
    }

    pub fn engine(&self) -> &SyncEngine<LocalTransport> {
        &self.engine
    }
}

/// Filename to file bytes, as seen on disk.
pub type DirContents = std::collections::BTreeMap<String, Vec<u8>>;

/// `len` random bytes.
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut data);
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_two_clients_share_a_server() {
        let server = TestServer::new();
        let mut a = server.client(4);
        let mut b = server.client(4);

        a.write("a.txt", b"abcdefgh");
        a.sync().await.unwrap();
        b.sync().await.unwrap();

        assert_eq!(b.read("a.txt").as_deref(), Some(&b"abcdefgh"[..]));
        assert_eq!(server.remote().await.len(), 1);
    }

    #[test]
    fn test_random_bytes_len() {
        assert_eq!(random_bytes(33).len(), 33);
    }
}
