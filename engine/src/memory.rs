//! In-memory collaborators.
//!
//! Complete implementations of every store trait, used for development runs,
//! tests and benchmarks. The local store applies change sets atomically
//! under one async mutex, mirroring the serial-writer rule real stores follow.

use crate::{
    error::Result, BlobStore, ChangeSet, CommitSummary, Entity, EntityKind, Error, LocalKey,
    LocalRecord, LocalStore, RemoteDocument, RemoteStore, RowId, StateStore,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Records of one kind, keyed by row.
#[derive(Debug, Clone, Default)]
struct Table {
    next_row: RowId,
    rows: BTreeMap<RowId, Entity>,
}

impl Table {
    fn insert(&mut self, entity: Entity) -> RowId {
        self.next_row += 1;
        self.rows.insert(self.next_row, entity);
        self.next_row
    }
}

/// Local store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    tables: Mutex<HashMap<EntityKind, Table>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records of one kind.
    pub async fn count(&self, kind: EntityKind) -> usize {
        self.tables
            .lock()
            .await
            .get(&kind)
            .map_or(0, |table| table.rows.len())
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<LocalRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .get(&kind)
            .map(|table| {
                table
                    .rows
                    .iter()
                    .map(|(row, entity)| LocalRecord::new(LocalKey::new(kind, *row), entity.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, key: LocalKey) -> Result<Option<LocalRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .get(&key.kind)
            .and_then(|table| table.rows.get(&key.row))
            .map(|entity| LocalRecord::new(key, entity.clone())))
    }

    async fn commit(&self, changes: ChangeSet) -> Result<CommitSummary> {
        let mut tables = self.tables.lock().await;

        // Validate everything before touching any table.
        for record in &changes.updates {
            if record.entity.kind() != record.key.kind {
                return Err(Error::Local(format!(
                    "cannot store {} under {}",
                    record.entity.kind(),
                    record.key
                )));
            }
            let exists = tables
                .get(&record.key.kind)
                .is_some_and(|table| table.rows.contains_key(&record.key.row));
            if !exists {
                return Err(Error::RecordNotFound(record.key.to_string()));
            }
        }

        let mut summary = CommitSummary::default();
        for record in changes.updates {
            if let Some(table) = tables.get_mut(&record.key.kind) {
                table.rows.insert(record.key.row, record.entity);
                summary.updated += 1;
            }
        }
        for key in changes.deletes {
            if let Some(table) = tables.get_mut(&key.kind) {
                if table.rows.remove(&key.row).is_some() {
                    summary.deleted += 1;
                }
            }
        }
        for entity in changes.inserts {
            let kind = entity.kind();
            let row = tables.entry(kind).or_default().insert(entity);
            summary.inserted.push(LocalKey::new(kind, row));
        }

        Ok(summary)
    }

    async fn delete_all(&self, kinds: &[EntityKind]) -> Result<usize> {
        let mut tables = self.tables.lock().await;
        let mut deleted = 0;
        for kind in kinds {
            if let Some(table) = tables.get_mut(kind) {
                deleted += table.rows.len();
                table.rows.clear();
            }
        }
        Ok(deleted)
    }
}

/// Remote document store kept in memory.
///
/// Listing order is document-ID order.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    collections: DashMap<String, BTreeMap<String, RemoteDocument>>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map_or(0, |documents| documents.len())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn list(&self, collection: &str) -> Result<Vec<RemoteDocument>> {
        Ok(self
            .collections
            .get(collection)
            .map(|documents| documents.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<RemoteDocument>> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|documents| documents.get(id).cloned()))
    }

    async fn set(&self, collection: &str, document: RemoteDocument) -> Result<()> {
        if document.id.is_empty() || document.id.contains('/') {
            return Err(Error::Remote(format!(
                "invalid document id '{}'",
                document.id
            )));
        }
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(document.id.clone(), document);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        if let Some(mut documents) = self.collections.get_mut(collection) {
            documents.remove(id);
        }
        Ok(())
    }

    async fn delete_all(&self, collection: &str) -> Result<usize> {
        Ok(self
            .collections
            .remove(collection)
            .map_or(0, |(_, documents)| documents.len()))
    }
}

const MEMORY_BLOB_PREFIX: &str = "memory://blobs/";

/// Object store kept in memory. Download URLs use the `memory://blobs/` scheme.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: DashMap<String, (Vec<u8>, String)>,
    fetches: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.contains_key(path)
    }

    pub fn content_type(&self, path: &str) -> Option<String> {
        self.objects.get(path).map(|entry| entry.1.clone())
    }

    /// Number of `get` calls served, cache misses included.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.objects
            .insert(path.to_string(), (bytes, content_type.to_string()));
        Ok(())
    }

    async fn download_url(&self, path: &str) -> Result<String> {
        if !self.objects.contains_key(path) {
            return Err(Error::Attachment(format!("no object at {path}")));
        }
        Ok(format!("{MEMORY_BLOB_PREFIX}{path}"))
    }

    async fn get(&self, url: &str, max_size: u64) -> Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let path = url.strip_prefix(MEMORY_BLOB_PREFIX).unwrap_or(url);
        let entry = self
            .objects
            .get(path)
            .ok_or_else(|| Error::Attachment(format!("no object at {url}")))?;

        let size = entry.0.len() as u64;
        if size > max_size {
            return Err(Error::AttachmentTooLarge {
                size,
                limit: max_size,
            });
        }
        Ok(entry.0.clone())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.objects.remove(path);
        Ok(())
    }

    async fn list(&self, folder: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", folder.trim_end_matches('/'));
        let mut paths: Vec<String> = self
            .objects
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix))
            .map(|entry| entry.key().clone())
            .collect();
        paths.sort();
        Ok(paths)
    }
}

/// Flag store kept in memory.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    flags: DashMap<String, bool>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get_flag(&self, key: &str) -> Result<bool> {
        Ok(self.flags.get(key).is_some_and(|value| *value))
    }

    async fn set_flag(&self, key: &str, value: bool) -> Result<()> {
        self.flags.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Employee, RegionalInfo};

    #[tokio::test]
    async fn commit_assigns_keys_and_applies_atomically() {
        let store = MemoryLocalStore::new();
        let summary = store
            .commit(
                ChangeSet::new()
                    .insert(Employee::new("Ana"))
                    .insert(RegionalInfo::default()),
            )
            .await
            .unwrap();

        assert_eq!(summary.inserted.len(), 2);
        assert_eq!(summary.inserted[0].kind, EntityKind::Employee);

        // An update of a missing record rejects the whole batch.
        let missing = LocalRecord::new(LocalKey::new(EntityKind::Employee, 99), Employee::new("X"));
        let result = store
            .commit(
                ChangeSet::new()
                    .insert(Employee::new("Bia"))
                    .update(missing),
            )
            .await;
        assert!(matches!(result, Err(Error::RecordNotFound(_))));
        assert_eq!(store.count(EntityKind::Employee).await, 1);
    }

    #[tokio::test]
    async fn delete_all_is_scoped_to_kinds() {
        let store = MemoryLocalStore::new();
        store.insert(Employee::new("Ana").into()).await.unwrap();
        store.insert(RegionalInfo::default().into()).await.unwrap();

        assert_eq!(store.delete_all(&[EntityKind::Employee]).await.unwrap(), 1);
        assert_eq!(store.count(EntityKind::RegionalInfo).await, 1);
    }

    #[tokio::test]
    async fn fetch_where_filters() {
        let store = MemoryLocalStore::new();
        store.insert(Employee::new("Ana").into()).await.unwrap();
        store.insert(Employee::new("Bia").into()).await.unwrap();

        let found = store
            .fetch_where(EntityKind::Employee, &|entity: &Entity| entity.name() == "Bia")
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn remote_rejects_slash_in_id() {
        let remote = MemoryRemoteStore::new();
        let result = remote.set("employees", RemoteDocument::new("a/b")).await;
        assert!(matches!(result, Err(Error::Remote(_))));

        remote.set("employees", RemoteDocument::new("a")).await.unwrap();
        assert_eq!(remote.delete_all("employees").await.unwrap(), 1);
        assert_eq!(remote.count("employees"), 0);
    }

    #[tokio::test]
    async fn state_flags_default_to_false() {
        let state = MemoryStateStore::new();
        assert!(!state.get_flag("migrator.employees.initial_push").await.unwrap());
        state.set_flag("migrator.employees.initial_push", true).await.unwrap();
        assert!(state.get_flag("migrator.employees.initial_push").await.unwrap());
    }
}
