use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::watch;

use crate::capability::{extract_blob_name, redact, CapabilityRoot};
use crate::error::{BlobError, BlobResult};
use crate::traits::BlobTransport;

#[derive(Clone, Debug)]
struct StoredBlob {
    data: Bytes,
    media_type: String,
}

#[derive(Default)]
struct State {
    /// Keyed by URL with the token removed, so rotating a token does not
    /// change which object a URL addresses.
    blobs: HashMap<String, StoredBlob>,
    put_counts: HashMap<String, usize>,
    failing: HashSet<String>,
    paused: HashMap<String, watch::Sender<bool>>,
}

/// In-memory [`BlobTransport`] for tests and local demos.
///
/// Besides storage it can simulate a misbehaving store: [`fail_blob`]
/// makes every operation on a blob name answer HTTP 500, and
/// [`pause_blob`] parks PUTs to a blob name until [`resume_blob`].
///
/// [`fail_blob`]: InMemoryBlobTransport::fail_blob
/// [`pause_blob`]: InMemoryBlobTransport::pause_blob
/// [`resume_blob`]: InMemoryBlobTransport::resume_blob
pub struct InMemoryBlobTransport {
    state: RwLock<State>,
}

impl InMemoryBlobTransport {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
        }
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.state.read().expect("lock poisoned").blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Seed an object directly, bypassing failure injection.
    pub fn insert(&self, url: &str, data: impl Into<Bytes>, media_type: &str) {
        self.state.write().expect("lock poisoned").blobs.insert(
            redact(url).to_string(),
            StoredBlob {
                data: data.into(),
                media_type: media_type.to_string(),
            },
        );
    }

    /// Current contents of the object at `url`, ignoring its token.
    pub fn contents(&self, url: &str) -> Option<Bytes> {
        let state = self.state.read().expect("lock poisoned");
        state.blobs.get(redact(url)).map(|b| b.data.clone())
    }

    pub fn media_type(&self, url: &str) -> Option<String> {
        let state = self.state.read().expect("lock poisoned");
        state.blobs.get(redact(url)).map(|b| b.media_type.clone())
    }

    /// How many successful PUTs `url` has received.
    pub fn put_count(&self, url: &str) -> usize {
        let state = self.state.read().expect("lock poisoned");
        state.put_counts.get(redact(url)).copied().unwrap_or(0)
    }

    /// Make every operation on `blob_name` fail with HTTP 500.
    pub fn fail_blob(&self, blob_name: &str) {
        let mut state = self.state.write().expect("lock poisoned");
        state.failing.insert(blob_name.to_string());
    }

    pub fn heal_blob(&self, blob_name: &str) {
        let mut state = self.state.write().expect("lock poisoned");
        state.failing.remove(blob_name);
    }

    /// Hold PUTs to `blob_name` until [`resume_blob`](Self::resume_blob).
    pub fn pause_blob(&self, blob_name: &str) {
        let mut state = self.state.write().expect("lock poisoned");
        state
            .paused
            .entry(blob_name.to_string())
            .or_insert_with(|| watch::channel(true).0);
    }

    pub fn resume_blob(&self, blob_name: &str) {
        let mut state = self.state.write().expect("lock poisoned");
        if let Some(sender) = state.paused.remove(blob_name) {
            let _ = sender.send(false);
        }
    }

    fn check_failure(&self, url: &str) -> BlobResult<()> {
        let name = extract_blob_name(url)?;
        let state = self.state.read().expect("lock poisoned");
        if state.failing.contains(name) {
            return Err(BlobError::status(500, "injected failure"));
        }
        Ok(())
    }

    async fn wait_if_paused(&self, url: &str) -> BlobResult<()> {
        let name = extract_blob_name(url)?;
        let receiver = {
            let state = self.state.read().expect("lock poisoned");
            state.paused.get(name).map(|sender| sender.subscribe())
        };
        if let Some(mut receiver) = receiver {
            // A dropped sender means the pause was lifted.
            let _ = receiver.wait_for(|paused| !*paused).await;
        }
        Ok(())
    }
}

impl Default for InMemoryBlobTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobTransport for InMemoryBlobTransport {
    async fn put(&self, url: &str, data: Bytes, media_type: &str) -> BlobResult<()> {
        self.wait_if_paused(url).await?;
        self.check_failure(url)?;
        let key = redact(url).to_string();
        let mut state = self.state.write().expect("lock poisoned");
        *state.put_counts.entry(key.clone()).or_insert(0) += 1;
        state.blobs.insert(
            key,
            StoredBlob {
                data,
                media_type: media_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, url: &str) -> BlobResult<Bytes> {
        self.check_failure(url)?;
        let state = self.state.read().expect("lock poisoned");
        state
            .blobs
            .get(redact(url))
            .map(|b| b.data.clone())
            .ok_or_else(|| BlobError::NotFound {
                url: redact(url).to_string(),
            })
    }

    async fn delete(&self, url: &str) -> BlobResult<()> {
        self.check_failure(url)?;
        let mut state = self.state.write().expect("lock poisoned");
        state.blobs.remove(redact(url));
        Ok(())
    }

    async fn list(&self, root: &CapabilityRoot) -> BlobResult<Vec<String>> {
        let prefix = format!("{}/", root.base());
        let state = self.state.read().expect("lock poisoned");
        let mut names: Vec<String> = state
            .blobs
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter(|name| !name.contains('/'))
            .map(str::to_string)
            .collect();
        names.sort();
        Ok(names)
    }
}

impl fmt::Debug for InMemoryBlobTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryBlobTransport")
            .field("blob_count", &self.len())
            .finish()
    }
}
