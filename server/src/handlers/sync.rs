//! Sync handlers - drive the engine for one collection.

use crate::error::{AppError, Result};
use migrator_engine::{
    EntityKind, LocalKey, MigrationOutcome, RowId, SyncEngine, SyncOperation, SyncPhase,
};
use serde::Serialize;

/// Response for operations over a whole collection.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionResponse {
    pub collection: &'static str,
    /// Documents written, pulled or removed
    pub count: usize,
}

/// Response for operations on one record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponse {
    pub collection: &'static str,
    /// Local storage identifier of the record
    pub record: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrateResponse {
    pub collection: &'static str,
    #[serde(flatten)]
    pub outcome: MigrationOutcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    pub operation: SyncOperation,
    pub phase: SyncPhase,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub collection: &'static str,
    pub tasks: Vec<TaskStatus>,
}

/// Resolve a `{collection}` path segment.
pub fn parse_collection(name: &str) -> Result<EntityKind> {
    name.parse::<EntityKind>()
        .map_err(|_| AppError::NotFound(format!("unknown collection: {name}")))
}

/// Resolve a `{key}` path segment: the record's positive local row number.
pub fn parse_record_key(raw: &str) -> Result<RowId> {
    match raw.trim().parse::<RowId>() {
        Ok(row) if row > 0 => Ok(row),
        _ => Err(AppError::BadRequest(format!("invalid record key '{raw}'"))),
    }
}

pub async fn handle_push_all(engine: &SyncEngine, kind: EntityKind) -> Result<CollectionResponse> {
    let count = engine.push_all(kind).await?;
    Ok(CollectionResponse {
        collection: kind.collection(),
        count,
    })
}

pub async fn handle_pull_all(engine: &SyncEngine, kind: EntityKind) -> Result<CollectionResponse> {
    let count = engine.pull_all(kind).await?;
    Ok(CollectionResponse {
        collection: kind.collection(),
        count,
    })
}

pub async fn handle_migrate(engine: &SyncEngine, kind: EntityKind) -> Result<MigrateResponse> {
    let outcome = engine.migrate_once(kind).await?;
    Ok(MigrateResponse {
        collection: kind.collection(),
        outcome,
    })
}

pub async fn handle_push_one(
    engine: &SyncEngine,
    kind: EntityKind,
    row: RowId,
) -> Result<RecordResponse> {
    let key = LocalKey::new(kind, row);
    engine.push_one(key).await?;
    Ok(RecordResponse {
        collection: kind.collection(),
        record: key.storage_uri(),
    })
}

pub async fn handle_delete(engine: &SyncEngine, kind: EntityKind, row: RowId) -> Result<RecordResponse> {
    let key = LocalKey::new(kind, row);
    engine.delete(key).await?;
    Ok(RecordResponse {
        collection: kind.collection(),
        record: key.storage_uri(),
    })
}

pub fn handle_status(engine: &SyncEngine, kind: EntityKind) -> StatusResponse {
    let tasks = engine
        .collection_status(kind)
        .into_iter()
        .map(|(task, phase)| TaskStatus {
            operation: task.operation,
            phase,
        })
        .collect();
    StatusResponse {
        collection: kind.collection(),
        tasks,
    }
}
