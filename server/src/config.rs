//! Configuration management for the server.

use migrator_engine::{attachment::DEFAULT_MAX_ATTACHMENT_BYTES, EngineConfig, RuntimeEnvironment};
use std::env;
use std::path::PathBuf;

const DEFAULT_DATABASE_URL: &str = "sqlite://migrator.db?mode=rwc";
const DEFAULT_CACHE_DIR: &str = "./cache/images";

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// SQLite connection URL for the local store
    pub database_url: String,
    /// Base URL of the remote document store
    pub remote_url: String,
    /// Base URL of the remote object store
    pub blob_url: String,
    /// Bearer token sent to both remote stores
    pub remote_token: Option<String>,
    pub cache_dir: PathBuf,
    pub max_attachment_bytes: u64,
    pub environment: RuntimeEnvironment,
    /// When set, the control API requires `Authorization: Bearer <secret>`
    pub auth_secret: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = var("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let database_url = var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let remote_url = var("REMOTE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingRemoteUrl)?;
        let blob_url = var("BLOB_URL").unwrap_or_else(|| remote_url.clone());
        let remote_token = var("REMOTE_TOKEN").filter(|token| !token.is_empty());

        let cache_dir = var("CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR));

        let max_attachment_bytes = match var("MAX_ATTACHMENT_BYTES") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidAttachmentLimit)?,
            None => DEFAULT_MAX_ATTACHMENT_BYTES,
        };

        let environment = match var("MIGRATOR_ENV") {
            Some(value) => value
                .parse()
                .map_err(ConfigError::InvalidEnvironment)?,
            None => RuntimeEnvironment::detect(None),
        };

        let auth_secret = var("AUTH_SECRET").filter(|secret| !secret.is_empty());

        Ok(Self {
            host,
            port,
            database_url,
            remote_url,
            blob_url,
            remote_token,
            cache_dir,
            max_attachment_bytes,
            environment,
            auth_secret,
        })
    }

    /// Engine settings derived from this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            cache_dir: self.cache_dir.clone(),
            max_attachment_bytes: self.max_attachment_bytes,
            ..EngineConfig::default()
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("REMOTE_URL environment variable is required")]
    MissingRemoteUrl,

    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid MAX_ATTACHMENT_BYTES value")]
    InvalidAttachmentLimit,

    #[error("Invalid MIGRATOR_ENV value: {0}")]
    InvalidEnvironment(String),
}
