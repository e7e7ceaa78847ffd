use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use snapshelf_blob::{BlobTransport, HttpBlobTransport};
use snapshelf_codec::{InlineImage, SnapshotCodec};
use snapshelf_types::{Comment, NewPhoto, Photo, PhotoPatch, Principal, RecordId};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{Bucket, Buckets, StoreConfig};
use crate::error::{StoreError, StoreResult};
use crate::sync::{Snapshot, SnapshotWriter};

/// Everything the store mutates, guarded by one async mutex.
struct CacheState {
    initialized: bool,
    photos: Vec<Photo>,
    /// `None` once the previous id was `u64::MAX`.
    next_photo_id: Option<RecordId>,
    next_comment_id: Option<RecordId>,
    /// Bumped on every mutation; orders index snapshots.
    generation: u64,
}

impl CacheState {
    fn empty() -> Self {
        Self {
            initialized: false,
            photos: Vec::new(),
            next_photo_id: Some(RecordId::new(1)),
            next_comment_id: Some(RecordId::new(1)),
            generation: 0,
        }
    }

    fn allocate_photo_id(&mut self) -> StoreResult<RecordId> {
        let id = self
            .next_photo_id
            .ok_or(StoreError::IdsExhausted { entity: "photo" })?;
        self.next_photo_id = id.next();
        Ok(id)
    }

    fn allocate_comment_id(&mut self) -> StoreResult<RecordId> {
        let id = self
            .next_comment_id
            .ok_or(StoreError::IdsExhausted { entity: "comment" })?;
        self.next_comment_id = id.next();
        Ok(id)
    }

    fn snapshot(&mut self) -> StoreResult<Snapshot> {
        self.generation += 1;
        Ok(Snapshot::capture(self.generation, &self.photos)?)
    }
}

/// Durable photo collection backed by whole-document object store snapshots.
///
/// Reads are served from an in-process cache that is filled from the
/// remote photo index on first use and trusted for the rest of the process
/// lifetime. Every mutation updates the cache first and then rewrites both
/// index documents:
///
/// - [`create_photo`](Self::create_photo) uploads the image and returns
///   before the index rewrite, which runs in the background and only logs
///   failures;
/// - every other mutation awaits the rewrite and reports its failure as
///   [`StoreError::Sync`], even though the cache already changed.
///
/// All operations take the same lock, so id allocation and cache updates
/// never interleave. Nothing coordinates separate processes.
pub struct PhotoStore {
    transport: Arc<dyn BlobTransport>,
    buckets: Arc<Buckets>,
    writer: Arc<SnapshotWriter>,
    state: Mutex<CacheState>,
    background: StdMutex<Vec<JoinHandle<()>>>,
}

impl PhotoStore {
    pub fn new(transport: Arc<dyn BlobTransport>, buckets: Buckets) -> Self {
        let buckets = Arc::new(buckets);
        let writer = Arc::new(SnapshotWriter::new(transport.clone(), buckets.clone()));
        let next_comment_id = Some(RecordId::new(buckets.comment_id_floor));
        Self {
            transport,
            buckets,
            writer,
            state: Mutex::new(CacheState {
                next_comment_id,
                ..CacheState::empty()
            }),
            background: StdMutex::new(Vec::new()),
        }
    }

    /// Build a store talking HTTP to the configured buckets.
    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        let buckets = config.buckets()?;
        let transport = HttpBlobTransport::new(config.request_timeout())?;
        Ok(Self::new(Arc::new(transport), buckets))
    }

    pub fn buckets(&self) -> &Buckets {
        &self.buckets
    }

    // ---- Reads ----

    /// Photos newest first, sliced to `[offset, offset + limit)`.
    ///
    /// There is no total count: fewer than `limit` results means the end
    /// was reached (see [`has_more`]).
    pub async fn list_photos(&self, offset: usize, limit: usize) -> StoreResult<Vec<Photo>> {
        let mut state = self.state.lock().await;
        self.ensure_initialized(&mut state).await;
        let mut ordered: Vec<&Photo> = state.photos.iter().collect();
        ordered.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| numeric(&b.id).cmp(&numeric(&a.id)))
        });
        Ok(ordered
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    pub async fn get_photo(&self, id: &str) -> StoreResult<Photo> {
        let mut state = self.state.lock().await;
        self.ensure_initialized(&mut state).await;
        state
            .photos
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| StoreError::photo_not_found(id))
    }

    pub async fn photo_count(&self) -> usize {
        let mut state = self.state.lock().await;
        self.ensure_initialized(&mut state).await;
        state.photos.len()
    }

    /// Blob names present in a bucket, straight from the object store.
    pub async fn list_blobs(&self, bucket: Bucket) -> StoreResult<Vec<String>> {
        Ok(self.transport.list(self.buckets.root(bucket)).await?)
    }

    // ---- Writes ----

    /// Upload the image and add the photo to the collection.
    ///
    /// Returns once the image is stored and the cache holds the photo. The
    /// index rewrite is left running in the background.
    pub async fn create_photo(&self, owner: &Principal, input: NewPhoto) -> StoreResult<Photo> {
        let input = input.normalized()?;
        let image = InlineImage::decode(&input.image).map_err(StoreError::InvalidImage)?;

        let mut state = self.state.lock().await;
        self.ensure_initialized(&mut state).await;

        let id = state.allocate_photo_id()?.to_string();
        let blob_name = self.buckets.image_blob_name(&id, image.extension());
        let image_url = self.buckets.photos.resolve(&blob_name);
        let size = image.data.len();
        self.transport
            .put(&image_url, image.data, &image.media_type)
            .await?;

        let photo = Photo::new(
            id,
            owner,
            image_url,
            input.title,
            input.description,
            Utc::now(),
        );
        state.photos.insert(0, photo.clone());
        info!(photo_id = %photo.id, blob = %blob_name, size, "photo created");

        match state.snapshot() {
            Ok(snapshot) => self.spawn_sync(snapshot),
            Err(e) => error!(photo_id = %photo.id, error = %e, "cannot encode index snapshot"),
        }
        Ok(photo)
    }

    /// Edit title and/or description. Only the owner may edit.
    pub async fn update_photo(
        &self,
        id: &str,
        caller: &Principal,
        patch: PhotoPatch,
    ) -> StoreResult<Photo> {
        let patch = patch.normalized()?;

        let mut state = self.state.lock().await;
        self.ensure_initialized(&mut state).await;

        let photo = state
            .photos
            .iter_mut()
            .find(|p| p.id == id && caller.owns(&p.owner_id))
            .ok_or_else(|| StoreError::photo_not_found(id))?;
        patch.apply(photo);
        let updated = photo.clone();
        debug!(photo_id = id, "photo updated");

        self.sync_now(&mut state).await?;
        Ok(updated)
    }

    /// Remove a photo with all of its comments. Only the owner may delete.
    ///
    /// After the index is rewritten, the image blob is removed on a best
    /// effort basis.
    pub async fn delete_photo(&self, id: &str, caller: &Principal) -> StoreResult<Photo> {
        let mut state = self.state.lock().await;
        self.ensure_initialized(&mut state).await;

        let index = state
            .photos
            .iter()
            .position(|p| p.id == id && caller.owns(&p.owner_id))
            .ok_or_else(|| StoreError::photo_not_found(id))?;
        let removed = state.photos.remove(index);
        info!(photo_id = id, comments = removed.comments.len(), "photo deleted");

        self.sync_now(&mut state).await?;
        drop(state);

        self.remove_image(&removed).await;
        Ok(removed)
    }

    /// Append a comment to a photo. Any principal may comment.
    pub async fn add_comment(
        &self,
        photo_id: &str,
        author: &Principal,
        content: &str,
    ) -> StoreResult<Comment> {
        let content = Comment::normalize_content(content)?;

        let mut state = self.state.lock().await;
        self.ensure_initialized(&mut state).await;

        let index = state
            .photos
            .iter()
            .position(|p| p.id == photo_id)
            .ok_or_else(|| StoreError::photo_not_found(photo_id))?;
        let comment_id = state.allocate_comment_id()?;
        let comment = Comment::new(comment_id.to_string(), photo_id, author, content, Utc::now());
        state.photos[index].comments.push(comment.clone());
        debug!(photo_id, comment_id = %comment.id, "comment added");

        self.sync_now(&mut state).await?;
        Ok(comment)
    }

    /// Remove a comment, searching every photo. Only its author may delete.
    pub async fn delete_comment(&self, comment_id: &str, caller: &Principal) -> StoreResult<Comment> {
        let mut state = self.state.lock().await;
        self.ensure_initialized(&mut state).await;

        let removed = state
            .photos
            .iter_mut()
            .find_map(|p| p.remove_comment_owned_by(comment_id, &caller.id))
            .ok_or_else(|| StoreError::comment_not_found(comment_id))?;
        debug!(photo_id = %removed.photo_id, comment_id, "comment deleted");

        self.sync_now(&mut state).await?;
        Ok(removed)
    }

    /// Wait for every background index rewrite started so far.
    ///
    /// Rewrite failures were already logged; this only reports completion.
    pub async fn flush_background(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut background = self.background.lock().expect("lock poisoned");
            background.drain(..).collect()
        };
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "background index sync task panicked");
            }
        }
    }

    // ---- Internals ----

    /// Load the photo index once. Any failure leaves an empty, usable
    /// collection; a missing index is the normal bootstrap case, anything
    /// else risks overwriting remote data on the next write and is logged
    /// loudly.
    async fn ensure_initialized(&self, state: &mut CacheState) {
        if state.initialized {
            return;
        }

        let url = self.buckets.photo_index_url();
        let mut photos = match self.transport.get(&url).await {
            Ok(body) => match SnapshotCodec::decode_photos(&body) {
                Ok(photos) => photos,
                Err(e) => {
                    error!(
                        blob = %self.buckets.photo_index,
                        error = %e,
                        "photo index is corrupt; starting empty, the next write will replace it"
                    );
                    Vec::new()
                }
            },
            Err(e) if e.is_not_found() => {
                info!(blob = %self.buckets.photo_index, "no photo index yet; starting empty");
                Vec::new()
            }
            Err(e) => {
                warn!(
                    blob = %self.buckets.photo_index,
                    error = %e,
                    "photo index fetch failed; starting empty, the next write will replace remote data"
                );
                Vec::new()
            }
        };

        for photo in &mut photos {
            if let Some(url) = self.buckets.photos.refresh(&photo.image_url) {
                photo.image_url = url;
            }
        }

        if let Some(max) = RecordId::max_of(photos.iter().map(|p| p.id.as_str())) {
            state.next_photo_id = max.next();
            if state.next_photo_id.is_none() {
                warn!(max = %max, "stored photo ids reach the id limit; creates will fail");
            }
        }
        let comment_ids = photos
            .iter()
            .flat_map(|p| p.comments.iter().map(|c| c.id.as_str()));
        if let Some(max) = RecordId::max_of(comment_ids) {
            state.next_comment_id = max.next();
            if state.next_comment_id.is_none() {
                warn!(max = %max, "stored comment ids reach the id limit; comments will fail");
            }
        }

        info!(
            photos = photos.len(),
            next_photo_id = ?state.next_photo_id.map(|id| id.value()),
            next_comment_id = ?state.next_comment_id.map(|id| id.value()),
            "photo cache initialized"
        );
        state.photos = photos;
        state.initialized = true;
    }

    async fn sync_now(&self, state: &mut CacheState) -> StoreResult<()> {
        let snapshot = state.snapshot()?;
        self.writer.write(snapshot).await.map_err(StoreError::Sync)?;
        Ok(())
    }

    fn spawn_sync(&self, snapshot: Snapshot) {
        let writer = Arc::clone(&self.writer);
        let generation = snapshot.generation;
        let handle = tokio::spawn(async move {
            if let Err(e) = writer.write(snapshot).await {
                error!(generation, error = %e, "background index sync failed; remote index is stale");
            }
        });
        let mut background = self.background.lock().expect("lock poisoned");
        background.retain(|h| !h.is_finished());
        background.push(handle);
    }

    async fn remove_image(&self, photo: &Photo) {
        let Some(url) = self.buckets.photos.refresh(&photo.image_url) else {
            return;
        };
        if let Err(e) = self.transport.delete(&url).await {
            warn!(photo_id = %photo.id, error = %e, "could not delete image blob");
        }
    }
}

impl std::fmt::Debug for PhotoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoStore")
            .field("photos", &self.buckets.photos)
            .field("comments", &self.buckets.comments)
            .finish()
    }
}

/// Whether a page of `returned` results suggests more are available.
pub fn has_more(returned: usize, limit: usize) -> bool {
    limit > 0 && returned == limit
}

fn numeric(id: &str) -> Option<RecordId> {
    RecordId::parse(id).ok()
}
