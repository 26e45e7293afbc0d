//! Client-side reconciliation.
//!
//! A pass compares three snapshots: the *base* (what this client last agreed
//! with the server, read from the index), the *current* scan of the directory,
//! and the *remote* map fetched once from the server. Four phases run in
//! order, and each filename is settled by at most one of them:
//!
//! 1. download names that are new to this client
//! 2. upload names the server has never seen
//! 3. commit local edits, or take the server's version when it moved on
//! 4. tombstone files deleted locally
//!
//! Every rejected compare-and-swap ends in the server's version winning. A
//! failure affects only the file being processed; the rest of the pass goes
//! on and the base is persisted regardless.

use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;

use blocksync_core::{
    hash_list, validate_filename, Block, BlockHash, FileContent, FileMetaData, Snapshot,
};
use tracing::{debug, info, warn};

use crate::client::RpcClient;
use crate::error::{Result, SyncError};
use crate::local::{is_eligible, LocalDir, LocalScan};
use crate::transport::Transport;

/// A file that could not be reconciled during a pass.
#[derive(Debug)]
pub struct FileFailure {
    pub filename: String,
    pub error: SyncError,
}

/// What a sync pass did.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Files written from the server's copy without any local edit lost.
    pub downloaded: Vec<String>,
    /// Files whose new version the server accepted from this client.
    pub uploaded: Vec<String>,
    /// Local deletions the server accepted as tombstones.
    pub deleted: Vec<String>,
    /// Local files removed because the server holds a tombstone.
    pub removed: Vec<String>,
    /// Files where a local change lost to a newer server version.
    pub conflicts: Vec<String>,
    /// Rejected updates the fetched snapshot could not explain yet.
    pub deferred: Vec<String>,
    /// Base entries dropped because neither side still has the file.
    pub dropped: Vec<String>,
    pub failures: Vec<FileFailure>,
    pub blocks_uploaded: usize,
    pub blocks_fetched: usize,
    pub blocks_reused: usize,
}

impl SyncReport {
    /// No failures and nothing deferred to a later pass.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.deferred.is_empty()
    }
}

/// State carried through the phases of one pass.
struct Pass<'a> {
    base: &'a Snapshot,
    current: &'a LocalScan,
    remote: &'a Snapshot,
    next: Snapshot,
    settled: HashSet<String>,
    report: SyncReport,
}

impl Pass<'_> {
    fn is_settled(&self, name: &str) -> bool {
        self.settled.contains(name)
    }

    fn settle(&mut self, name: &str, result: Result<()>) {
        self.settled.insert(name.to_owned());
        if let Err(error) = result {
            warn!(file = name, error = %error, "skipping file for this pass");
            self.report.failures.push(FileFailure {
                filename: name.to_owned(),
                error,
            });
        }
    }

    fn base_version(&self, name: &str) -> u64 {
        self.base.get(name).map_or(0, |meta| meta.version)
    }
}

/// Synchronizes one directory with a server.
pub struct SyncEngine<T: Transport> {
    client: RpcClient<T>,
    local: LocalDir,
}

impl<T: Transport> SyncEngine<T> {
    /// Create an engine for `base_dir`, chunking at `block_size` bytes.
    pub fn new(transport: T, base_dir: impl Into<PathBuf>, block_size: usize) -> Result<Self> {
        Ok(Self::with_client(
            RpcClient::new(transport),
            LocalDir::new(base_dir, block_size)?,
        ))
    }

    pub fn with_client(client: RpcClient<T>, local: LocalDir) -> Self {
        Self { client, local }
    }

    pub fn client(&self) -> &RpcClient<T> {
        &self.client
    }

    pub fn local(&self) -> &LocalDir {
        &self.local
    }

    /// Run one reconciliation pass.
    ///
    /// Fails as a whole only if the index cannot be loaded or persisted, the
    /// directory cannot be listed, or the remote map cannot be fetched. A file
    /// that cannot be read is a failure for that file alone.
    pub async fn sync(&mut self) -> Result<SyncReport> {
        let base = self.local.load_index()?;
        let scan = self.local.scan()?;
        let current = scan.files;
        let remote = self.client.get_file_info_map().await?;
        debug!(
            base = base.len(),
            current = current.len(),
            remote = remote.len(),
            "starting sync pass"
        );

        let mut pass = Pass {
            base: &base,
            current: &current,
            remote: &remote,
            next: base.clone(),
            settled: HashSet::new(),
            report: SyncReport::default(),
        };

        // Unreadable files keep their base entry and are not mistaken for deletions.
        for (name, error) in scan.unreadable {
            pass.settle(&name, Err(error));
        }

        self.download_new(&mut pass).await;
        self.upload_local_only(&mut pass).await;
        self.commit_changed(&mut pass).await;
        self.delete_removed(&mut pass).await;

        self.local.persist_index(&pass.next)?;

        let report = pass.report;
        info!(
            downloaded = report.downloaded.len(),
            uploaded = report.uploaded.len(),
            deleted = report.deleted.len(),
            conflicts = report.conflicts.len(),
            failures = report.failures.len(),
            "sync pass complete"
        );
        Ok(report)
    }

    /// Phase 1: remote names this client has never seen, and names it holds
    /// as deleted that the server shows at a newer version.
    async fn download_new(&self, pass: &mut Pass<'_>) {
        let remote = pass.remote;
        for (name, meta) in remote {
            if pass.is_settled(name) {
                continue;
            }
            if !is_eligible(name) {
                warn!(file = %name, "ignoring remote entry with a name this client never syncs");
                continue;
            }
            let local = pass.current.contains_key(name);
            let wanted = match pass.base.get(name) {
                None => !local,
                Some(base) if base.is_tombstone() && meta.version > base.version => {
                    !meta.is_tombstone() || !local
                }
                Some(_) => false,
            };
            if !wanted {
                continue;
            }

            let result = self.download(pass, name, meta).await;
            pass.settle(name, result);
        }
    }

    async fn download(&self, pass: &mut Pass<'_>, name: &str, meta: &FileMetaData) -> Result<()> {
        validate_filename(name)?;
        if meta.is_tombstone() {
            // Nothing on disk to remove.
            debug!(file = name, version = meta.version, "recording remote tombstone");
            pass.next.insert(name.to_owned(), meta.clone());
            return Ok(());
        }

        self.materialize(pass, name, meta).await?;
        pass.report.downloaded.push(name.to_owned());
        Ok(())
    }

    /// Phase 2: names known locally that the server does not have.
    async fn upload_local_only(&self, pass: &mut Pass<'_>) {
        let candidates: BTreeSet<String> = pass
            .base
            .keys()
            .chain(pass.current.keys())
            .filter(|name| !pass.remote.contains_key(*name))
            .cloned()
            .collect();

        for name in &candidates {
            if pass.is_settled(name) {
                continue;
            }

            if pass.current.contains_key(name) {
                let result = self.upload(pass, name, 1).await;
                pass.settle(name, result);
            } else {
                debug!(file = %name, "dropping entry unknown to both sides");
                pass.next.remove(name);
                pass.report.dropped.push(name.clone());
                pass.settle(name, Ok(()));
            }
        }
    }

    /// Phase 3: files present locally that the base or the server knows.
    async fn commit_changed(&self, pass: &mut Pass<'_>) {
        let (base, current, remote) = (pass.base, pass.current, pass.remote);
        for (name, hashes) in current {
            if pass.is_settled(name) {
                continue;
            }
            let base = base.get(name);
            let remote = remote.get(name);
            if base.is_none() && remote.is_none() {
                continue;
            }

            let result = self.reconcile_changed(pass, name, hashes, base, remote).await;
            pass.settle(name, result);
        }
    }

    async fn reconcile_changed(
        &self,
        pass: &mut Pass<'_>,
        name: &str,
        hashes: &[BlockHash],
        base: Option<&FileMetaData>,
        remote: Option<&FileMetaData>,
    ) -> Result<()> {
        // A new file recreates a name the server holds as deleted.
        if let (None, Some(meta)) = (base, remote) {
            if meta.is_tombstone() {
                return self.upload(pass, name, meta.version + 1).await;
            }
        }

        // A missing base is version 0 with no blocks.
        let base_version = base.map_or(0, |meta| meta.version);
        let changed = match base {
            Some(meta) => !holds(&meta.content, hashes),
            None => !hashes.is_empty(),
        };

        match remote.map(|meta| meta.version) {
            None => {
                if changed {
                    self.upload(pass, name, base_version + 1).await?;
                }
            }
            Some(version) if version == base_version => {
                if changed {
                    self.upload(pass, name, base_version + 1).await?;
                }
            }
            Some(version) if version > base_version => {
                if changed {
                    warn!(
                        file = name,
                        base = base_version,
                        remote = version,
                        "local edit discarded, server has a newer version"
                    );
                    self.resolve_conflict(pass, name).await?;
                } else if self.converge_to_remote(pass, name).await?
                    && !remote.is_some_and(FileMetaData::is_tombstone)
                {
                    pass.report.downloaded.push(name.to_owned());
                }
            }
            Some(version) => {
                warn!(
                    file = name,
                    base = base_version,
                    remote = version,
                    "server version is behind the local index, skipping"
                );
            }
        }
        Ok(())
    }

    /// Phase 4: live base entries whose file is gone from the directory.
    async fn delete_removed(&self, pass: &mut Pass<'_>) {
        let base = pass.base;
        for (name, meta) in base {
            if pass.is_settled(name) || meta.is_tombstone() || pass.current.contains_key(name) {
                continue;
            }

            let tombstone = FileMetaData::tombstone(name.as_str(), meta.version + 1);
            let result = match self.commit(pass, tombstone).await {
                Ok(()) => {
                    pass.report.deleted.push(name.clone());
                    Ok(())
                }
                Err(SyncError::VersionConflict { .. }) => self.resolve_conflict(pass, name).await,
                Err(e) => Err(e),
            };
            pass.settle(name, result);
        }
    }

    /// Chunk `name` from disk, send missing blocks and commit at `version`.
    async fn upload(&self, pass: &mut Pass<'_>, name: &str, version: u64) -> Result<()> {
        let blocks = self.local.read_blocks(name)?;
        pass.report.blocks_uploaded += self.client.upload_missing(&blocks).await?;

        let meta = FileMetaData::live(name, version, hash_list(&blocks));
        match self.commit(pass, meta).await {
            Ok(()) => {
                pass.report.uploaded.push(name.to_owned());
                Ok(())
            }
            Err(SyncError::VersionConflict {
                current_version, ..
            }) => {
                debug!(
                    file = name,
                    attempted = version,
                    current = current_version,
                    "update rejected"
                );
                self.resolve_conflict(pass, name).await
            }
            Err(e) => Err(e),
        }
    }

    /// Compare-and-swap `meta` on the server and record it in the next base.
    async fn commit(&self, pass: &mut Pass<'_>, meta: FileMetaData) -> Result<()> {
        let outcome = self.client.update_file(&meta).await?;
        if !outcome.accepted {
            return Err(SyncError::VersionConflict {
                filename: meta.filename,
                attempted: meta.version,
                current_version: outcome.current_version,
            });
        }
        pass.next.insert(meta.filename.clone(), meta);
        Ok(())
    }

    async fn resolve_conflict(&self, pass: &mut Pass<'_>, name: &str) -> Result<()> {
        if self.converge_to_remote(pass, name).await? {
            pass.report.conflicts.push(name.to_owned());
        } else {
            pass.report.deferred.push(name.to_owned());
        }
        Ok(())
    }

    /// Make the local file match the fetched remote entry, if it is newer
    /// than the base. Returns whether anything was applied.
    async fn converge_to_remote(&self, pass: &mut Pass<'_>, name: &str) -> Result<bool> {
        let base_version = pass.base_version(name);
        let remote = pass.remote;
        match remote.get(name) {
            Some(meta) if meta.version > base_version => {
                self.materialize(pass, name, meta).await?;
                Ok(true)
            }
            _ => {
                info!(
                    file = name,
                    base = base_version,
                    "fetched snapshot predates the server's version, retrying next pass"
                );
                Ok(false)
            }
        }
    }

    /// Write the remote version of `name` to disk and adopt it as base.
    async fn materialize(&self, pass: &mut Pass<'_>, name: &str, meta: &FileMetaData) -> Result<()> {
        validate_filename(name)?;
        match &meta.content {
            FileContent::Tombstone => {
                if self.local.remove_file(name)? {
                    info!(file = name, version = meta.version, "removed deleted file");
                    pass.report.removed.push(name.to_owned());
                }
            }
            FileContent::Live(hashes) => self.reconstruct(pass, name, hashes).await?,
        }
        pass.next.insert(name.to_owned(), meta.clone());
        Ok(())
    }

    /// Rebuild `name` from `hashes`, reusing blocks already on disk at the
    /// same position and fetching the rest.
    async fn reconstruct(&self, pass: &mut Pass<'_>, name: &str, hashes: &[BlockHash]) -> Result<()> {
        let on_disk = pass.current.contains_key(name);
        let held: Vec<(BlockHash, Block)> = if on_disk {
            self.local
                .read_blocks(name)?
                .into_iter()
                .map(|block| (block.hash(), block))
                .collect()
        } else {
            Vec::new()
        };

        let mut blocks = Vec::with_capacity(hashes.len());
        let mut fetched = 0;
        for (i, hash) in hashes.iter().enumerate() {
            match held.get(i) {
                Some((held_hash, block)) if held_hash == hash => blocks.push(block.clone()),
                _ => {
                    blocks.push(self.client.get_block(hash).await?);
                    fetched += 1;
                }
            }
        }

        let reused = hashes.len() - fetched;
        if on_disk && fetched == 0 && held.len() == hashes.len() {
            debug!(file = name, "local content already matches");
        } else {
            self.local.write_file(name, &blocks)?;
            info!(file = name, fetched, reused, "reconstructed file");
        }

        pass.report.blocks_fetched += fetched;
        pass.report.blocks_reused += reused;
        Ok(())
    }
}

/// Whether `content` is a live file with exactly `hashes`.
fn holds(content: &FileContent, hashes: &[BlockHash]) -> bool {
    matches!(content, FileContent::Live(live) if live.as_slice() == hashes)
}
