//! Persisted sync flags.

use async_trait::async_trait;
use migrator_engine::{error::Result, StateStore};

use super::{local_error, Pool};

/// [`StateStore`] backed by the `sync_state` table.
#[derive(Debug, Clone)]
pub struct SqliteStateStore {
    pool: Pool,
}

impl SqliteStateStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn get_flag(&self, key: &str) -> Result<bool> {
        let row: Option<(bool,)> = sqlx::query_as("SELECT value FROM sync_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(local_error)?;

        Ok(row.is_some_and(|(value,)| value))
    }

    async fn set_flag(&self, key: &str, value: bool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sync_state (key, value) VALUES (?, ?)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(local_error)?;

        tracing::debug!(key, value, "Stored sync flag");
        Ok(())
    }
}
