//! Foundation types for snapshelf.
//!
//! This crate provides the record types shared by every other snapshelf
//! crate. Records are plain owned values; the collection store owns the live
//! copies and hands out clones.
//!
//! # Key Types
//!
//! - [`Photo`]: An uploaded photograph with its embedded comment thread
//! - [`Comment`]: A single comment, owned by exactly one photo
//! - [`Principal`]: The `{id, display_name}` identity of the acting user
//! - [`NewPhoto`] / [`PhotoPatch`]: Inputs for creating and editing photos
//! - [`RecordId`]: Decimal record identifier helpers

pub mod error;
pub mod id;
pub mod principal;
pub mod record;

pub use error::TypeError;
pub use id::RecordId;
pub use principal::Principal;
pub use record::{Comment, NewPhoto, Photo, PhotoPatch};
