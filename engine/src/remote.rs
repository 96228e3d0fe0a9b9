//! Remote store facades: the document collections and the object store
//! that holds attachments.

use crate::{error::Result, RemoteDocument};
use async_trait::async_trait;

/// Per-collection CRUD over the remote document database.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Every document in a collection, in the store's listing order.
    async fn list(&self, collection: &str) -> Result<Vec<RemoteDocument>>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<RemoteDocument>>;

    /// Create or fully replace a document.
    async fn set(&self, collection: &str, document: RemoteDocument) -> Result<()>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Delete every document in a collection, returning how many were removed.
    async fn delete_all(&self, collection: &str) -> Result<usize>;
}

/// Binary object storage attached to the remote database.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` at `path` with the given content type.
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Durable download URL for an object.
    async fn download_url(&self, path: &str) -> Result<String>;

    /// Fetch the object behind `url`.
    ///
    /// Fails with [`crate::Error::AttachmentTooLarge`] when the object is
    /// larger than `max_size` bytes.
    async fn get(&self, url: &str, max_size: u64) -> Result<Vec<u8>>;

    async fn delete(&self, path: &str) -> Result<()>;

    /// Paths of every object under `folder`.
    async fn list(&self, folder: &str) -> Result<Vec<String>>;
}
