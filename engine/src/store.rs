//! Local store facade.
//!
//! The engine never talks to the on-device database directly. It reads
//! through [`LocalStore`] and hands every mutation back as a [`ChangeSet`],
//! which the store must apply atomically.

use crate::{error::Result, Entity, EntityKind, LocalKey, LocalRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A batch of local mutations applied in one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    /// New entities; the store assigns their keys.
    pub inserts: Vec<Entity>,
    /// Full replacements of existing records.
    pub updates: Vec<LocalRecord>,
    /// Records to remove, including owned sub-entities.
    pub deletes: Vec<LocalKey>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, entity: impl Into<Entity>) -> Self {
        self.inserts.push(entity.into());
        self
    }

    pub fn update(mut self, record: LocalRecord) -> Self {
        self.updates.push(record);
        self
    }

    pub fn delete(mut self, key: LocalKey) -> Self {
        self.deletes.push(key);
        self
    }

    /// Total number of mutations.
    pub fn len(&self) -> usize {
        self.inserts.len() + self.updates.len() + self.deletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a committed change set did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitSummary {
    /// Keys assigned to the inserted entities, in insertion order.
    pub inserted: Vec<LocalKey>,
    pub updated: usize,
    pub deleted: usize,
}

/// CRUD/query facade over the on-device store.
///
/// Implementations must funnel all writes through a single serial context
/// per store instance, and must apply a [`ChangeSet`] all-or-nothing.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// All records of one kind.
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<LocalRecord>>;

    /// Records of one kind satisfying a predicate.
    async fn fetch_where(
        &self,
        kind: EntityKind,
        predicate: &(dyn for<'e> Fn(&'e Entity) -> bool + Send + Sync),
    ) -> Result<Vec<LocalRecord>> {
        let records = self.fetch_all(kind).await?;
        Ok(records
            .into_iter()
            .filter(|record| predicate(&record.entity))
            .collect())
    }

    /// A single record, if it still exists.
    async fn get(&self, key: LocalKey) -> Result<Option<LocalRecord>>;

    /// Apply a change set in one transaction.
    async fn commit(&self, changes: ChangeSet) -> Result<CommitSummary>;

    /// Insert one entity and return its key.
    async fn insert(&self, entity: Entity) -> Result<LocalKey> {
        let kind = entity.kind();
        let summary = self.commit(ChangeSet::new().insert(entity)).await?;
        summary
            .inserted
            .into_iter()
            .next()
            .ok_or_else(|| crate::Error::Local(format!("insert into {kind} returned no key")))
    }

    /// Delete every record of the given kinds in one transaction.
    ///
    /// Returns the number of records removed.
    async fn delete_all(&self, kinds: &[EntityKind]) -> Result<usize>;
}
