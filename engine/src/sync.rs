//! The sync engine.
//!
//! Orchestrates the four top-level operations between the local store and
//! the remote document store:
//!
//! - **push-all**: mirror every local record of a kind to its remote document
//! - **push-one**: mirror a single record
//! - **pull-all**: upsert every remote document of a kind into the local store
//! - **delete**: remove the remote document, then the local record
//!
//! Per-record work inside push-all and pull-all runs concurrently and is
//! joined before the aggregate result is produced. Push and delete on the
//! same record are serialized through [`KeyedLocks`]; a pull holds the locks
//! of every record it may touch from resolution until its commit.
//!
//! Every operation moves through [`SyncPhase`]s that are recorded per
//! [`SyncTask`] and broadcast as [`SyncEvent`]s.

use crate::{
    attachment::AttachmentPipeline,
    document::{self, fields},
    error::Result,
    identity::{self, IdentityResolver},
    locks::{KeyedLocks, Tombstones},
    state, BlobStore, ChangeSet, EngineConfig, Entity, EntityKind, Error, LocalKey, LocalRecord,
    LocalStore, RemoteDocument, RemoteStore, StateStore,
};
use dashmap::DashMap;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, OwnedMutexGuard};

/// Top-level operations the engine exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncOperation {
    PushAll,
    PushOne,
    PullAll,
    Delete,
    RemoveDuplicates,
    Migrate,
    Reset,
}

/// An operation, scoped to a collection when it has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncTask {
    pub operation: SyncOperation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<EntityKind>,
}

impl SyncTask {
    pub fn new(operation: SyncOperation, kind: EntityKind) -> Self {
        Self {
            operation,
            collection: Some(kind),
        }
    }

    /// A task that spans every collection.
    pub fn global(operation: SyncOperation) -> Self {
        Self {
            operation,
            collection: None,
        }
    }
}

/// Lifecycle of a sync task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncPhase {
    #[default]
    Idle,
    InFlight,
    Completed,
    Failed,
}

/// A phase transition, as broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEvent {
    pub task: SyncTask,
    pub phase: SyncPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of [`SyncEngine::migrate_once`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "count", rename_all = "camelCase")]
pub enum MigrationOutcome {
    /// The initial push ran and wrote this many documents.
    Migrated(usize),
    /// The initial push already happened on this device.
    Skipped,
}

/// The collaborators an engine works against.
#[derive(Clone)]
pub struct Stores {
    pub local: Arc<dyn LocalStore>,
    pub remote: Arc<dyn RemoteStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub state: Arc<dyn StateStore>,
}

/// Bidirectional sync between the local store and the remote store.
///
/// The engine is the only component that writes remote documents.
pub struct SyncEngine {
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore>,
    state: Arc<dyn StateStore>,
    attachments: AttachmentPipeline,
    locks: KeyedLocks,
    tombstones: Tombstones,
    status: DashMap<SyncTask, SyncPhase>,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncEngine {
    pub fn new(stores: Stores, config: &EngineConfig) -> Self {
        let attachments = AttachmentPipeline::new(
            stores.blobs,
            config.attachment_namespace.clone(),
            config.cache_dir.clone(),
            config.max_attachment_bytes,
        );
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        Self {
            local: stores.local,
            remote: stores.remote,
            state: stores.state,
            attachments,
            locks: KeyedLocks::new(),
            tombstones: Tombstones::new(),
            status: DashMap::new(),
            events,
        }
    }

    pub fn local(&self) -> &Arc<dyn LocalStore> {
        &self.local
    }

    pub fn attachments(&self) -> &AttachmentPipeline {
        &self.attachments
    }

    /// Receive every phase transition from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Latest phase of a task; tasks that never ran are [`SyncPhase::Idle`].
    pub fn status(&self, task: SyncTask) -> SyncPhase {
        self.status.get(&task).map(|p| *p).unwrap_or_default()
    }

    /// Latest phase of every task that has run against a collection.
    pub fn collection_status(&self, kind: EntityKind) -> Vec<(SyncTask, SyncPhase)> {
        let mut statuses: Vec<_> = self
            .status
            .iter()
            .filter(|entry| entry.key().collection == Some(kind))
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        statuses.sort_by_key(|(task, _)| task.operation);
        statuses
    }

    /// Mirror every local record of `kind` to the remote store.
    ///
    /// All writes are attempted even when some fail. Succeeds with the
    /// number of documents written only if every write succeeded, otherwise
    /// fails with the first error.
    pub async fn push_all(&self, kind: EntityKind) -> Result<usize> {
        let task = SyncTask::new(SyncOperation::PushAll, kind);
        self.track(task, self.push_all_inner(kind), |count| Some(*count))
            .await
    }

    /// Mirror a single local record to the remote store.
    pub async fn push_one(&self, key: LocalKey) -> Result<()> {
        let task = SyncTask::new(SyncOperation::PushOne, key.kind);
        let work = async {
            if self.push_key(key).await? {
                Ok(())
            } else {
                Err(Error::RecordNotFound(key.to_string()))
            }
        };
        self.track(task, work, |_| Some(1)).await
    }

    /// Upsert every remote document of `kind` into the local store.
    ///
    /// Remote always wins: every mirrored field is overwritten. All local
    /// mutations are committed in a single transaction once every document
    /// has been processed.
    pub async fn pull_all(&self, kind: EntityKind) -> Result<usize> {
        let task = SyncTask::new(SyncOperation::PullAll, kind);
        self.track(task, self.pull_all_inner(kind), |count| Some(*count))
            .await
    }

    /// Delete a record everywhere: remote document first, then its
    /// attachment (best-effort), then the local record.
    ///
    /// When the remote delete fails the local record is left untouched.
    pub async fn delete(&self, key: LocalKey) -> Result<()> {
        let task = SyncTask::new(SyncOperation::Delete, key.kind);
        self.track(task, self.delete_inner(key), |_| Some(1)).await
    }

    /// Delete remote documents whose normalized name repeats an earlier one.
    ///
    /// "Earlier" follows the remote store's listing order, which is not
    /// guaranteed to be stable, so which copy survives is unspecified.
    /// Returns the number of documents removed.
    pub async fn remove_duplicates(&self, kind: EntityKind) -> Result<usize> {
        let task = SyncTask::new(SyncOperation::RemoveDuplicates, kind);
        self.track(task, self.remove_duplicates_inner(kind), |count| {
            Some(*count)
        })
        .await
    }

    /// Run the initial push of a collection once per device.
    ///
    /// The persisted flag is set only after the push succeeds, so a failed
    /// migration is retried on the next call.
    pub async fn migrate_once(&self, kind: EntityKind) -> Result<MigrationOutcome> {
        let task = SyncTask::new(SyncOperation::Migrate, kind);
        let work = async {
            let key = state::flag_key(kind, state::INITIAL_PUSH);
            let _guard = self.locks.lock(&key).await;

            if self.state.get_flag(&key).await? {
                tracing::debug!(collection = %kind, "Initial push already done");
                return Ok(MigrationOutcome::Skipped);
            }

            let count = self.push_all(kind).await?;
            self.state.set_flag(&key, true).await?;
            tracing::info!(collection = %kind, count, "Initial push complete");
            Ok(MigrationOutcome::Migrated(count))
        };
        self.track(task, work, |outcome| match outcome {
            MigrationOutcome::Migrated(count) => Some(*count),
            MigrationOutcome::Skipped => Some(0),
        })
        .await
    }

    /// Delete every remote document of a collection.
    pub async fn wipe_remote(&self, kind: EntityKind) -> Result<usize> {
        let deleted = self.remote.delete_all(kind.collection()).await?;
        tracing::info!(collection = %kind, deleted, "Wiped remote collection");
        Ok(deleted)
    }

    /// Delete every object in the attachment folder.
    pub async fn wipe_attachments(&self) -> Result<usize> {
        self.attachments.wipe().await
    }

    /// Run `work` as `task`, recording and broadcasting its phases.
    pub(crate) async fn track<T>(
        &self,
        task: SyncTask,
        work: impl Future<Output = Result<T>>,
        count: impl FnOnce(&T) -> Option<usize>,
    ) -> Result<T> {
        self.transition(task, SyncPhase::InFlight, None, None);
        let result = work.await;
        match &result {
            Ok(value) => self.transition(task, SyncPhase::Completed, count(value), None),
            Err(e) => self.transition(task, SyncPhase::Failed, None, Some(e.to_string())),
        }
        result
    }

    fn transition(
        &self,
        task: SyncTask,
        phase: SyncPhase,
        count: Option<usize>,
        error: Option<String>,
    ) {
        self.status.insert(task, phase);
        // No subscribers is fine.
        let _ = self.events.send(SyncEvent {
            task,
            phase,
            count,
            error,
        });
    }

    async fn push_all_inner(&self, kind: EntityKind) -> Result<usize> {
        let records = self.local.fetch_all(kind).await?;
        tracing::info!(collection = %kind, records = records.len(), "Pushing collection");

        let results = join_all(records.iter().map(|record| self.push_key(record.key))).await;
        self.locks.prune();

        let mut written = 0;
        let mut failed = 0;
        let mut first_error = None;
        for (record, result) in records.iter().zip(results) {
            match result {
                Ok(true) => written += 1,
                Ok(false) => {
                    tracing::debug!(record = %record.key, "Record deleted before push, skipping");
                }
                Err(e) => {
                    tracing::warn!(record = %record.key, "Push failed: {}", e);
                    failed += 1;
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            None => {
                tracing::info!(collection = %kind, written, "Push complete");
                Ok(written)
            }
            Some(e) => {
                tracing::warn!(collection = %kind, written, failed, "Push finished with failures");
                Err(e)
            }
        }
    }

    /// Push the current state of one record. Returns `false` when the record
    /// no longer exists.
    async fn push_key(&self, key: LocalKey) -> Result<bool> {
        let _guard = self.locks.lock(&key.storage_uri()).await;
        match self.local.get(key).await? {
            Some(record) => {
                self.write_document(&record).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn write_document(&self, record: &LocalRecord) -> Result<()> {
        let id = identity::remote_id_for(record);
        let image_url = match &record.entity {
            Entity::Employee(employee) => match &employee.photo {
                Some(bytes) => match self.attachments.upload(bytes, &id).await {
                    Ok(url) => Some(url),
                    Err(e) => {
                        tracing::warn!(record = %record.key, "Photo upload failed, writing without image: {}", e);
                        None
                    }
                },
                None => employee.photo_url.clone(),
            },
            _ => None,
        };

        let doc = document::entity_document(&id, &record.entity, image_url.as_deref());
        self.remote.set(record.key.kind.collection(), doc).await?;
        tracing::debug!(record = %record.key, document = %id, "Wrote remote document");
        Ok(())
    }

    async fn pull_all_inner(&self, kind: EntityKind) -> Result<usize> {
        let _pull = self.locks.lock(&format!("pull:{}", kind.collection())).await;
        let mark = self.tombstones.begin();

        let documents = self.remote.list(kind.collection()).await?;
        tracing::info!(collection = %kind, documents = documents.len(), "Pulling collection");

        let photos = join_all(documents.iter().map(|doc| self.fetch_photo(kind, doc))).await;

        // Held until the commit so no record can be deleted underneath it.
        let (locals, _guards) = self.lock_collection(kind).await?;

        let mut resolver = IdentityResolver::new(kind, locals);
        let mut applied = 0;
        let mut created = 0;
        for (doc, photo) in documents.iter().zip(photos) {
            if mark.is_deleted(kind, &doc.id) {
                tracing::debug!(document = %doc.id, "Document deleted during pull, skipping");
                continue;
            }
            let resolved = resolver.local_record_for(doc);
            if resolved.created {
                created += 1;
            }
            resolver.update(resolved.slot, |entity| {
                document::apply_document(doc, entity);
                if let (Entity::Employee(employee), Some(bytes)) = (entity, photo) {
                    employee.photo = Some(bytes);
                }
            });
            applied += 1;
        }

        let changes = resolver.into_change_set();
        let summary = self.local.commit(changes).await?;
        self.locks.prune();
        tracing::info!(
            collection = %kind,
            processed = applied,
            created,
            updated = summary.updated,
            removed = summary.deleted,
            "Pull complete"
        );
        Ok(applied)
    }

    /// Lock every record of `kind` and return them as they stand under the
    /// locks. Records deleted before their lock was taken are left out.
    async fn lock_collection(
        &self,
        kind: EntityKind,
    ) -> Result<(Vec<LocalRecord>, Vec<OwnedMutexGuard<()>>)> {
        let mut guards: HashMap<LocalKey, OwnedMutexGuard<()>> = HashMap::new();
        loop {
            let records = self.local.fetch_all(kind).await?;
            let mut unlocked: Vec<LocalKey> = records
                .iter()
                .map(|record| record.key)
                .filter(|key| !guards.contains_key(key))
                .collect();
            if unlocked.is_empty() {
                return Ok((records, guards.into_values().collect()));
            }
            unlocked.sort();
            for key in unlocked {
                let guard = self.locks.lock(&key.storage_uri()).await;
                guards.insert(key, guard);
            }
        }
    }

    /// Download the photo a document references. Failures are logged and
    /// yield `None`.
    async fn fetch_photo(&self, kind: EntityKind, doc: &RemoteDocument) -> Option<Vec<u8>> {
        if kind != EntityKind::Employee {
            return None;
        }
        let url = doc.image_url()?;
        match self.attachments.download(&url).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(document = %doc.id, "Photo download failed: {}", e);
                None
            }
        }
    }

    async fn delete_inner(&self, key: LocalKey) -> Result<()> {
        let _guard = self.locks.lock(&key.storage_uri()).await;
        let record = self
            .local
            .get(key)
            .await?
            .ok_or_else(|| Error::RecordNotFound(key.to_string()))?;
        let id = identity::remote_id_for(&record);

        if let Err(e) = self.remote.delete(key.kind.collection(), &id).await {
            tracing::warn!(record = %key, document = %id, "Remote delete failed, keeping local record: {}", e);
            return Err(e);
        }

        self.tombstones.record(key.kind, &id);

        if key.kind == EntityKind::Employee {
            self.attachments.delete_attachment(&id).await;
        }

        self.local.commit(ChangeSet::new().delete(key)).await?;
        tracing::info!(record = %key, document = %id, "Deleted record");
        Ok(())
    }

    async fn remove_duplicates_inner(&self, kind: EntityKind) -> Result<usize> {
        let collection = kind.collection();
        let documents = self.remote.list(collection).await?;

        let mut seen = HashSet::new();
        let duplicates: Vec<&RemoteDocument> = documents
            .iter()
            .filter(|doc| !seen.insert(identity::normalize(&doc.string(fields::NAME))))
            .collect();

        let results = join_all(duplicates.iter().map(|doc| async move {
            self.remote.delete(collection, &doc.id).await?;
            self.tombstones.record(kind, &doc.id);
            if kind == EntityKind::Employee {
                self.attachments.delete_attachment(&doc.id).await;
            }
            Ok::<_, Error>(())
        }))
        .await;

        let mut removed = 0;
        let mut first_error = None;
        for (doc, result) in duplicates.iter().zip(results) {
            match result {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(document = %doc.id, "Failed to delete duplicate: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        tracing::info!(collection = %kind, scanned = documents.len(), removed, "Duplicate sweep finished");
        match first_error {
            None => Ok(removed),
            Some(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("attachments", &self.attachments)
            .field("locks", &self.locks.len())
            .finish_non_exhaustive()
    }
}
