//! Engine configuration.

use crate::attachment::{DEFAULT_MAX_ATTACHMENT_BYTES, DEFAULT_NAMESPACE};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::str::FromStr;

/// Where the host process is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    Development,
    Preview,
    #[default]
    Production,
}

impl RuntimeEnvironment {
    /// Resolve the environment from an explicit setting, falling back to
    /// detection: a debug build attached to a terminal counts as development.
    pub fn detect(explicit: Option<&str>) -> Self {
        if let Some(env) = explicit.and_then(|value| value.parse().ok()) {
            return env;
        }
        if cfg!(debug_assertions) && std::io::stdin().is_terminal() {
            RuntimeEnvironment::Development
        } else {
            RuntimeEnvironment::Production
        }
    }

    /// Destructive maintenance is only allowed outside production.
    pub fn allows_reset(self) -> bool {
        !matches!(self, RuntimeEnvironment::Production)
    }
}

impl FromStr for RuntimeEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(RuntimeEnvironment::Development),
            "preview" => Ok(RuntimeEnvironment::Preview),
            "production" | "prod" => Ok(RuntimeEnvironment::Production),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

/// Tunables for a [`crate::SyncEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Object-store folder holding employee photos.
    pub attachment_namespace: String,
    /// Download size limit for a single attachment.
    pub max_attachment_bytes: u64,
    /// Directory of the on-disk attachment cache.
    pub cache_dir: PathBuf,
    /// Buffered sync events per subscriber before it starts lagging.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            attachment_namespace: DEFAULT_NAMESPACE.to_string(),
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
            cache_dir: std::env::temp_dir().join("migrator").join("images"),
            event_capacity: 256,
        }
    }
}
