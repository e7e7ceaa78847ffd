use std::sync::Arc;

use bytes::Bytes;
use snapshelf_blob::{BlobResult, BlobTransport};
use snapshelf_codec::{CodecResult, SnapshotCodec, JSON_MEDIA_TYPE};
use snapshelf_types::Photo;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::Buckets;

/// Encoded copy of both index documents at one cache generation.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub generation: u64,
    pub photos: Bytes,
    pub comments: Bytes,
}

impl Snapshot {
    /// Encode the photo index and the flattened comment index.
    pub fn capture(generation: u64, photos: &[Photo]) -> CodecResult<Self> {
        Ok(Self {
            generation,
            photos: SnapshotCodec::encode_photos(photos)?,
            comments: SnapshotCodec::encode_comments(&SnapshotCodec::flatten_comments(photos))?,
        })
    }
}

/// Outcome of a [`SnapshotWriter::write`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// A newer generation already reached the store.
    Superseded,
}

/// Serializes index rewrites and drops ones that arrive out of order.
///
/// Background writes race with awaited ones. Each index document remembers
/// the newest generation that reached the store, and an upload is skipped
/// when that document already holds something newer, so a slow background
/// write can never clobber a newer snapshot, even after a partial failure.
pub struct SnapshotWriter {
    transport: Arc<dyn BlobTransport>,
    buckets: Arc<Buckets>,
    last_written: Mutex<LastWritten>,
}

/// Newest generation stored per index document.
#[derive(Clone, Copy, Debug, Default)]
struct LastWritten {
    photos: u64,
    comments: u64,
}

impl SnapshotWriter {
    pub fn new(transport: Arc<dyn BlobTransport>, buckets: Arc<Buckets>) -> Self {
        Self {
            transport,
            buckets,
            last_written: Mutex::new(LastWritten::default()),
        }
    }

    /// Upload both index documents.
    ///
    /// Both uploads are attempted even if the first fails; the first error
    /// is returned. A document's generation is recorded only when its own
    /// upload succeeds, so a failed write never blocks a later retry of the
    /// same content.
    pub async fn write(&self, snapshot: Snapshot) -> BlobResult<WriteOutcome> {
        let generation = snapshot.generation;
        let mut last = self.last_written.lock().await;
        if generation <= last.photos && generation <= last.comments {
            debug!(
                generation,
                photos_written = last.photos,
                comments_written = last.comments,
                "skipping superseded index snapshot"
            );
            return Ok(WriteOutcome::Superseded);
        }

        let mut first_error = None;
        if generation > last.photos {
            match self.put_index(self.buckets.photo_index_url(), snapshot.photos).await {
                Ok(()) => last.photos = generation,
                Err(e) => first_error = Some(e),
            }
        }
        if generation > last.comments {
            match self.put_index(self.buckets.comment_index_url(), snapshot.comments).await {
                Ok(()) => last.comments = generation,
                Err(e) => first_error = first_error.or(Some(e)),
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        debug!(generation, "index snapshot written");
        Ok(WriteOutcome::Written)
    }

    async fn put_index(&self, url: String, body: Bytes) -> BlobResult<()> {
        self.transport.put(&url, body, JSON_MEDIA_TYPE).await
    }
}
