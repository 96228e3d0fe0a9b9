//! Error types for the Migrator engine.

use thiserror::Error;

/// All possible errors from the Migrator engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Lookup errors
    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    // Store errors
    #[error("remote store error: {0}")]
    Remote(String),

    #[error("local store error: {0}")]
    Local(String),

    // Attachment errors
    #[error("attachment transfer failed: {0}")]
    Attachment(String),

    #[error("attachment too large: {size} bytes exceeds limit of {limit} bytes")]
    AttachmentTooLarge { size: u64, limit: u64 },

    #[error("attachment cache error: {0}")]
    Cache(String),

    // Policy errors
    #[error("operation not permitted: {0}")]
    NotPermitted(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Cache(err.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
