//! Destructive reset: wipe local and remote state, then reseed.
//!
//! Only runs outside production. Steps run in order and the first failure
//! aborts the rest:
//!
//! 1. delete every local employee and municipality (one transaction)
//! 2. delete both remote collections and the attachment folder
//! 3. insert the default dataset locally
//! 4. push the reseeded collections back to the remote store

use crate::{
    error::Result,
    seed,
    sync::{SyncEngine, SyncOperation, SyncTask},
    ChangeSet, EntityKind, Error, RuntimeEnvironment,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

const RESET_KINDS: [EntityKind; 2] = [EntityKind::Employee, EntityKind::Municipality];

/// What a completed reset did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetReport {
    pub local_deleted: usize,
    pub remote_deleted: usize,
    pub attachments_deleted: usize,
    pub seeded: usize,
    pub pushed: usize,
}

/// Wipes and reseeds the directory.
#[derive(Debug)]
pub struct ResetEngine {
    engine: Arc<SyncEngine>,
    environment: RuntimeEnvironment,
}

impl ResetEngine {
    pub fn new(engine: Arc<SyncEngine>, environment: RuntimeEnvironment) -> Self {
        Self {
            engine,
            environment,
        }
    }

    /// Run the full reset sequence.
    ///
    /// Fails with [`Error::NotPermitted`] in production without touching
    /// any store.
    pub async fn reset(&self) -> Result<ResetReport> {
        let task = SyncTask::global(SyncOperation::Reset);
        self.engine
            .track(task, self.run(), |report| Some(report.seeded))
            .await
    }

    async fn run(&self) -> Result<ResetReport> {
        if !self.environment.allows_reset() {
            tracing::warn!(environment = ?self.environment, "Refusing to reset outside development");
            return Err(Error::NotPermitted(
                "reset is only available in development or preview builds".to_string(),
            ));
        }

        let mut report = ResetReport::default();

        report.local_deleted = step("delete local records", async {
            self.engine.local().delete_all(&RESET_KINDS).await
        })
        .await?;

        for kind in RESET_KINDS {
            report.remote_deleted += step("wipe remote collection", self.engine.wipe_remote(kind)).await?;
        }
        report.attachments_deleted =
            step("wipe attachment folder", self.engine.wipe_attachments()).await?;

        let dataset = seed::default_dataset();
        let changes = dataset
            .into_iter()
            .fold(ChangeSet::new(), |changes, entity| changes.insert(entity));
        report.seeded = step("reseed local store", async {
            Ok(self.engine.local().commit(changes).await?.inserted.len())
        })
        .await?;

        for kind in RESET_KINDS {
            report.pushed += step("push reseeded collection", self.engine.push_all(kind)).await?;
        }

        tracing::info!(?report, "Reset complete");
        Ok(report)
    }
}

/// Run one reset step, logging its outcome.
async fn step<T: std::fmt::Debug>(
    name: &'static str,
    work: impl Future<Output = Result<T>>,
) -> Result<T> {
    match work.await {
        Ok(value) => {
            tracing::info!(step = name, result = ?value, "Reset step done");
            Ok(value)
        }
        Err(e) => {
            tracing::error!(step = name, "Reset step failed, aborting: {}", e);
            Err(e)
        }
    }
}
