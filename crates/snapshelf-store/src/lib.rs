//! Durable collection store for snapshelf.
//!
//! [`PhotoStore`] keeps the whole photo collection in memory and persists it
//! as two JSON index documents in an object store: one for photos (with
//! their comments nested) and one flat list of every comment. Images are
//! stored as separate blobs next to the photo index.
//!
//! The cache is the source of truth once loaded. Each process loads the
//! photo index once, on first use, and from then on only writes.

pub mod config;
pub mod error;
pub mod store;
pub mod sync;

pub use config::{Bucket, Buckets, StoreConfig, ENV_COMMENTS_URL, ENV_PHOTOS_URL};
pub use error::{ErrorClass, StoreError, StoreResult};
pub use store::{has_more, PhotoStore};
pub use sync::{Snapshot, SnapshotWriter, WriteOutcome};
