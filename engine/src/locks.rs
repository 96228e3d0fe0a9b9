//! Per-record serialization.
//!
//! Push and delete on the same record must not interleave. Each record
//! identity maps to its own async mutex; different records never contend.
//!
//! A pull reads the remote listing long before it commits, so it also
//! consults [`Tombstones`] to learn which listed documents were deleted
//! while it ran.

use crate::EntityKind;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Async mutexes keyed by record identity.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    /// Drop entries nobody holds or waits on.
    pub fn prune(&self) {
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Remote documents deleted while at least one pull is in flight.
#[derive(Debug, Default)]
pub struct Tombstones {
    clock: AtomicU64,
    deleted: DashMap<(EntityKind, String), u64>,
    pulls: DashMap<u64, ()>,
}

impl Tombstones {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start observing deletions. Entries are kept until the returned mark
    /// is dropped.
    pub fn begin(&self) -> PullMark<'_> {
        let seq = self.clock.fetch_add(1, Ordering::SeqCst);
        self.pulls.insert(seq, ());
        PullMark { owner: self, seq }
    }

    /// Record that a remote document is gone.
    pub fn record(&self, kind: EntityKind, id: &str) {
        if self.pulls.is_empty() {
            return;
        }
        let seq = self.clock.fetch_add(1, Ordering::SeqCst);
        self.deleted.insert((kind, id.to_string()), seq);
    }

    /// Number of recorded deletions.
    pub fn len(&self) -> usize {
        self.deleted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deleted.is_empty()
    }

    fn end(&self, seq: u64) {
        self.pulls.remove(&seq);
        match self.pulls.iter().map(|entry| *entry.key()).min() {
            Some(oldest) => self.deleted.retain(|_, deleted_at| *deleted_at > oldest),
            None => self.deleted.clear(),
        }
    }
}

/// An in-flight pull's view of [`Tombstones`].
#[derive(Debug)]
pub struct PullMark<'a> {
    owner: &'a Tombstones,
    seq: u64,
}

impl PullMark<'_> {
    /// Whether the document was deleted after this pull began.
    pub fn is_deleted(&self, kind: EntityKind, id: &str) -> bool {
        self.owner
            .deleted
            .get(&(kind, id.to_string()))
            .is_some_and(|deleted_at| *deleted_at > self.seq)
    }
}

impl Drop for PullMark<'_> {
    fn drop(&mut self) {
        self.owner.end(self.seq);
    }
}
