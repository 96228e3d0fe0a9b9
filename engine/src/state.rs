//! Persisted sync state.
//!
//! "Has this already run" markers live here under namespaced keys instead of
//! in process-wide booleans, so they survive restarts.

use crate::{error::Result, EntityKind};
use async_trait::async_trait;

/// Key prefix for every flag the engine writes.
pub const NAMESPACE: &str = "migrator";

/// Flag set once the first full push of a collection has succeeded.
pub const INITIAL_PUSH: &str = "initial_push";

/// Small persistent key-value store for sync flags.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Current value of a flag; unset flags read as `false`.
    async fn get_flag(&self, key: &str) -> Result<bool>;

    /// Set a flag. Setting it to its current value is a no-op.
    async fn set_flag(&self, key: &str, value: bool) -> Result<()>;
}

/// Namespaced key for a per-collection flag, e.g. `migrator.employees.initial_push`.
pub fn flag_key(kind: EntityKind, name: &str) -> String {
    format!("{}.{}.{}", NAMESPACE, kind.collection(), name)
}
