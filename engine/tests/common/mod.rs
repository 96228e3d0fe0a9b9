//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use migrator_engine::{
    error::Result,
    memory::{MemoryBlobStore, MemoryLocalStore, MemoryRemoteStore, MemoryStateStore},
    BlobStore, ChangeSet, CommitSummary, EngineConfig, EntityKind, Error, LocalKey, LocalRecord,
    LocalStore, RemoteDocument, RemoteStore, Stores, SyncEngine,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// An engine wired to in-memory stores, with handles to inspect them.
pub struct Fixture {
    pub local: Arc<MemoryLocalStore>,
    pub remote: Arc<MemoryRemoteStore>,
    pub blobs: Arc<MemoryBlobStore>,
    pub engine: Arc<SyncEngine>,
    pub cache: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_remote(Arc::new(MemoryRemoteStore::new()))
    }

    /// A fresh device sharing `remote` with other fixtures.
    pub fn with_remote(remote: Arc<MemoryRemoteStore>) -> Self {
        Self::build(remote.clone(), remote, Arc::new(MemoryBlobStore::new()), None, None)
    }

    pub fn build(
        remote: Arc<MemoryRemoteStore>,
        remote_facade: Arc<dyn RemoteStore>,
        blobs: Arc<MemoryBlobStore>,
        blob_facade: Option<Arc<dyn BlobStore>>,
        local_facade: Option<Arc<dyn LocalStore>>,
    ) -> Self {
        let cache = tempfile::tempdir().unwrap();
        let local = Arc::new(MemoryLocalStore::new());
        let config = EngineConfig {
            cache_dir: cache.path().join("images"),
            ..EngineConfig::default()
        };
        let engine = Arc::new(SyncEngine::new(
            Stores {
                local: local_facade.unwrap_or_else(|| local.clone()),
                remote: remote_facade,
                blobs: blob_facade.unwrap_or_else(|| blobs.clone()),
                state: Arc::new(MemoryStateStore::new()),
            },
            &config,
        ));

        Self {
            local,
            remote,
            blobs,
            engine,
            cache,
        }
    }

    pub async fn employees(&self) -> Vec<LocalRecord> {
        self.local.fetch_all(EntityKind::Employee).await.unwrap()
    }
}

/// Remote store whose deletes always fail.
pub struct FailingDeletes(pub Arc<MemoryRemoteStore>);

#[async_trait]
impl RemoteStore for FailingDeletes {
    async fn list(&self, collection: &str) -> Result<Vec<RemoteDocument>> {
        self.0.list(collection).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<RemoteDocument>> {
        self.0.get(collection, id).await
    }

    async fn set(&self, collection: &str, document: RemoteDocument) -> Result<()> {
        self.0.set(collection, document).await
    }

    async fn delete(&self, _collection: &str, _id: &str) -> Result<()> {
        Err(Error::Remote("permission denied".into()))
    }

    async fn delete_all(&self, _collection: &str) -> Result<usize> {
        Err(Error::Remote("permission denied".into()))
    }
}

/// Blob store whose uploads always fail.
pub struct FailingUploads(pub Arc<MemoryBlobStore>);

#[async_trait]
impl BlobStore for FailingUploads {
    async fn put(&self, _path: &str, _bytes: Vec<u8>, _content_type: &str) -> Result<()> {
        Err(Error::Remote("quota exceeded".into()))
    }

    async fn download_url(&self, path: &str) -> Result<String> {
        self.0.download_url(path).await
    }

    async fn get(&self, url: &str, max_size: u64) -> Result<Vec<u8>> {
        self.0.get(url, max_size).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.0.delete(path).await
    }

    async fn list(&self, folder: &str) -> Result<Vec<String>> {
        self.0.list(folder).await
    }
}

/// Local store whose commits always fail.
pub struct FailingCommits(pub Arc<MemoryLocalStore>);

#[async_trait]
impl LocalStore for FailingCommits {
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<LocalRecord>> {
        self.0.fetch_all(kind).await
    }

    async fn get(&self, key: LocalKey) -> Result<Option<LocalRecord>> {
        self.0.get(key).await
    }

    async fn commit(&self, _changes: ChangeSet) -> Result<CommitSummary> {
        Err(Error::Local("database is locked".into()))
    }

    async fn delete_all(&self, kinds: &[EntityKind]) -> Result<usize> {
        self.0.delete_all(kinds).await
    }
}

/// Remote store that refuses writes to a single document.
pub struct RefusingWrites {
    pub inner: Arc<MemoryRemoteStore>,
    pub refused: String,
}

#[async_trait]
impl RemoteStore for RefusingWrites {
    async fn list(&self, collection: &str) -> Result<Vec<RemoteDocument>> {
        self.inner.list(collection).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<RemoteDocument>> {
        self.inner.get(collection, id).await
    }

    async fn set(&self, collection: &str, document: RemoteDocument) -> Result<()> {
        if document.id == self.refused {
            return Err(Error::Remote(format!("write to {} refused", document.id)));
        }
        self.inner.set(collection, document).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.inner.delete(collection, id).await
    }

    async fn delete_all(&self, collection: &str) -> Result<usize> {
        self.inner.delete_all(collection).await
    }
}

/// Blob store whose downloads take `delay` before answering.
pub struct SlowDownloads {
    pub inner: Arc<MemoryBlobStore>,
    pub delay: Duration,
}

#[async_trait]
impl BlobStore for SlowDownloads {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.inner.put(path, bytes, content_type).await
    }

    async fn download_url(&self, path: &str) -> Result<String> {
        self.inner.download_url(path).await
    }

    async fn get(&self, url: &str, max_size: u64) -> Result<Vec<u8>> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(url, max_size).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.inner.delete(path).await
    }

    async fn list(&self, folder: &str) -> Result<Vec<String>> {
        self.inner.list(folder).await
    }
}

/// Remote store whose listings are taken immediately but returned after
/// `delay`, so they can be stale by the time the caller sees them.
pub struct SlowListing {
    pub inner: Arc<MemoryRemoteStore>,
    pub delay: Duration,
}

#[async_trait]
impl RemoteStore for SlowListing {
    async fn list(&self, collection: &str) -> Result<Vec<RemoteDocument>> {
        let documents = self.inner.list(collection).await?;
        tokio::time::sleep(self.delay).await;
        Ok(documents)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<RemoteDocument>> {
        self.inner.get(collection, id).await
    }

    async fn set(&self, collection: &str, document: RemoteDocument) -> Result<()> {
        self.inner.set(collection, document).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.inner.delete(collection, id).await
    }

    async fn delete_all(&self, collection: &str) -> Result<usize> {
        self.inner.delete_all(collection).await
    }
}
