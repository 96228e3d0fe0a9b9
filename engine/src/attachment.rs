//! Attachment pipeline: employee photos in the remote object store.
//!
//! Uploads go to `<namespace>/<owner>.jpg`. Downloads are cached on disk under
//! the last path segment of their URL, so a photo is fetched over the
//! network at most once per device.

use crate::{error::Result, BlobStore, Error};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Default folder for employee photos.
pub const DEFAULT_NAMESPACE: &str = "employeeImages";

/// Content type of every uploaded photo.
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Default download size limit (8 MiB).
pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 8 * 1024 * 1024;

/// Moves photo bytes between local records and the remote object store.
pub struct AttachmentPipeline {
    blobs: Arc<dyn BlobStore>,
    namespace: String,
    cache_dir: PathBuf,
    max_size: u64,
}

impl AttachmentPipeline {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        namespace: impl Into<String>,
        cache_dir: impl Into<PathBuf>,
        max_size: u64,
    ) -> Self {
        Self {
            blobs,
            namespace: namespace.into(),
            cache_dir: cache_dir.into(),
            max_size,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Object path for an owner's photo.
    pub fn object_path(&self, owner_id: &str) -> String {
        format!("{}/{}.jpg", self.namespace, owner_id)
    }

    /// Upload a photo and return its durable download URL.
    ///
    /// Callers treat failure as non-fatal: the owning document is still
    /// written, just without an image URL.
    pub async fn upload(&self, bytes: &[u8], owner_id: &str) -> Result<String> {
        if bytes.is_empty() {
            return Err(Error::Attachment(format!(
                "photo for {owner_id} has no encoded bytes"
            )));
        }

        let path = self.object_path(owner_id);
        self.blobs
            .put(&path, bytes.to_vec(), JPEG_CONTENT_TYPE)
            .await
            .map_err(|e| Error::Attachment(format!("upload of {path} failed: {e}")))?;

        let url = self
            .blobs
            .download_url(&path)
            .await
            .map_err(|e| Error::Attachment(format!("no download URL for {path}: {e}")))?;

        tracing::debug!(path = %path, size = bytes.len(), "Uploaded attachment");
        Ok(url)
    }

    /// Fetch the bytes behind `url`, serving repeat requests from disk.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let cache_path = self.cache_path(url);

        if let Some(path) = &cache_path {
            match tokio::fs::read(path).await {
                Ok(bytes) => {
                    tracing::trace!(url = %url, "Attachment cache hit");
                    return Ok(bytes);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Unreadable cache entry: {}", e);
                }
            }
        }

        let bytes = self.blobs.get(url, self.max_size).await?;
        if bytes.len() as u64 > self.max_size {
            return Err(Error::AttachmentTooLarge {
                size: bytes.len() as u64,
                limit: self.max_size,
            });
        }

        if let Some(path) = &cache_path {
            if let Err(e) = self.write_cache(path, &bytes).await {
                tracing::warn!(path = %path.display(), "Failed to cache attachment: {}", e);
            }
        }

        Ok(bytes)
    }

    /// Delete an owner's photo. Failures are logged, never returned.
    pub async fn delete_attachment(&self, owner_id: &str) {
        let path = self.object_path(owner_id);
        match self.blobs.delete(&path).await {
            Ok(()) => tracing::debug!(path = %path, "Deleted attachment"),
            Err(e) => tracing::warn!(path = %path, "Failed to delete attachment: {}", e),
        }
    }

    /// Delete every object in the namespace folder.
    ///
    /// Individual delete failures are logged and skipped. Returns the number
    /// of objects removed.
    pub async fn wipe(&self) -> Result<usize> {
        let paths = self.blobs.list(&self.namespace).await?;
        let results =
            futures::future::join_all(paths.iter().map(|path| self.blobs.delete(path))).await;

        let mut deleted = 0;
        for (path, result) in paths.iter().zip(results) {
            match result {
                Ok(()) => deleted += 1,
                Err(e) => tracing::warn!(path = %path, "Failed to delete attachment: {}", e),
            }
        }

        tracing::info!(folder = %self.namespace, deleted, "Wiped attachment folder");
        Ok(deleted)
    }

    /// Cache file for a URL: its last path segment, without query or fragment.
    fn cache_path(&self, url: &str) -> Option<PathBuf> {
        let without_query = url.split(['?', '#']).next().unwrap_or_default();
        let segment = without_query.rsplit('/').next().unwrap_or_default().trim();
        // Percent-encoded object paths keep the folder in the last segment.
        let segment = segment.rsplit("%2F").next().unwrap_or(segment);

        if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
            return None;
        }
        Some(self.cache_dir.join(segment))
    }

    /// Write through a unique temp file and rename, so concurrent writers of
    /// the same key never expose a partial file.
    async fn write_cache(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        let tmp = self.cache_dir.join(format!(".{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        Ok(())
    }
}

impl std::fmt::Debug for AttachmentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentPipeline")
            .field("namespace", &self.namespace)
            .field("cache_dir", &self.cache_dir)
            .field("max_size", &self.max_size)
            .finish()
    }
}
