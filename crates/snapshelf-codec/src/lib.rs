//! Snapshot codec for snapshelf.
//!
//! Two kinds of payload cross the object store boundary:
//!
//! - index snapshots: each logical collection is one JSON array, rewritten
//!   whole on every mutation ([`SnapshotCodec`]);
//! - inline images: a `<media-type>;base64,<body>` string as submitted by
//!   clients, turned into raw bytes for upload ([`InlineImage`]).

pub mod error;
pub mod image;
pub mod snapshot;

pub use error::{CodecError, CodecResult};
pub use image::{extension_for_media_type, InlineImage, DEFAULT_MEDIA_TYPE};
pub use snapshot::{SnapshotCodec, JSON_MEDIA_TYPE};
