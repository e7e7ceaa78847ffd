use async_trait::async_trait;
use bytes::Bytes;

use crate::capability::CapabilityRoot;
use crate::error::BlobResult;

/// Whole-object transport to a remote object store.
///
/// Every URL passed in is a fully resolved capability URL; authorization
/// travels in its query string, never in headers.
#[async_trait]
pub trait BlobTransport: Send + Sync {
    /// Create or overwrite the object at `url`.
    async fn put(&self, url: &str, data: Bytes, media_type: &str) -> BlobResult<()>;

    /// Fetch the object at `url`.
    ///
    /// Returns [`BlobError::NotFound`](crate::BlobError::NotFound) when the
    /// object does not exist; callers decide whether that is fatal.
    async fn get(&self, url: &str) -> BlobResult<Bytes>;

    /// Delete the object at `url`. Deleting a missing object succeeds.
    async fn delete(&self, url: &str) -> BlobResult<()>;

    /// Names of every blob in the bucket. Diagnostics only.
    async fn list(&self, root: &CapabilityRoot) -> BlobResult<Vec<String>>;
}
