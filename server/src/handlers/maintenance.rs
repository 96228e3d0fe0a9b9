//! Maintenance handlers - duplicate cleanup and development resets.

use super::CollectionResponse;
use crate::error::Result;
use migrator_engine::{EntityKind, ResetEngine, ResetReport, SyncEngine};

pub async fn handle_dedupe(engine: &SyncEngine, kind: EntityKind) -> Result<CollectionResponse> {
    let count = engine.remove_duplicates(kind).await?;
    Ok(CollectionResponse {
        collection: kind.collection(),
        count,
    })
}

pub async fn handle_reset(reset: &ResetEngine) -> Result<ResetReport> {
    Ok(reset.reset().await?)
}
