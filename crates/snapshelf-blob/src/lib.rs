//! Object store access for snapshelf.
//!
//! The remote store only understands whole-object PUT, GET, and DELETE on
//! capability URLs: URLs whose query string carries a time-limited access
//! token. This crate keeps the two concerns apart:
//!
//! - [`CapabilityRoot`] -- joins a bucket's root capability URL with a blob
//!   name, and recovers the blob name from a URL it issued. Pure, no I/O.
//! - [`BlobTransport`] -- the network boundary, with [`HttpBlobTransport`]
//!   for real stores and [`InMemoryBlobTransport`] for tests and demos.
//!
//! # Design Rules
//!
//! 1. Only the blob name is durable identity. Full URLs are recomputed from
//!    the name and whatever root is configured right now.
//! 2. PUT always overwrites; there is no create-if-absent.
//! 3. DELETE of a missing blob succeeds.
//! 4. Tokens never appear in errors or logs (see [`redact`]).

pub mod capability;
pub mod error;
pub mod http;
pub mod listing;
pub mod memory;
pub mod traits;

pub use capability::{extract_blob_name, redact, CapabilityRoot};
pub use error::{BlobError, BlobResult};
pub use http::HttpBlobTransport;
pub use listing::parse_blob_names;
pub use memory::InMemoryBlobTransport;
pub use traits::BlobTransport;
