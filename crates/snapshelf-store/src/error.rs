use snapshelf_blob::BlobError;
use snapshelf_codec::CodecError;
use snapshelf_types::TypeError;
use thiserror::Error;

/// Errors from collection store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record does not exist, or exists but is not owned by the caller.
    /// The two cases are deliberately indistinguishable.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Missing or blank required input, caught before any I/O.
    #[error("invalid input: {0}")]
    Validation(#[from] TypeError),

    /// The inline image payload could not be decoded.
    #[error("invalid image payload: {0}")]
    InvalidImage(#[source] CodecError),

    /// The object store rejected a request that had to succeed.
    #[error("object store error: {0}")]
    Transport(#[from] BlobError),

    #[error("snapshot codec error: {0}")]
    Codec(#[from] CodecError),

    /// The index rewrite failed after the cache had already changed. The
    /// cache keeps the change; the remote copy lags until the next
    /// successful write.
    #[error("index sync failed: {0}")]
    Sync(#[source] BlobError),

    #[error("configuration error: {0}")]
    Config(String),

    /// Every id after the largest stored one has been handed out.
    #[error("no {entity} ids left to allocate")]
    IdsExhausted { entity: &'static str },
}

/// How a caller-facing layer should present a [`StoreError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// "Not found or not yours."
    NotFound,
    /// The caller can fix the input and retry.
    BadRequest,
    /// A server-side failure.
    Internal,
}

impl StoreError {
    pub(crate) fn photo_not_found(id: &str) -> Self {
        Self::NotFound {
            entity: "photo",
            id: id.to_string(),
        }
    }

    pub(crate) fn comment_not_found(id: &str) -> Self {
        Self::NotFound {
            entity: "comment",
            id: id.to_string(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::Validation(_) | Self::InvalidImage(_) => ErrorClass::BadRequest,
            Self::Transport(_)
            | Self::Codec(_)
            | Self::Sync(_)
            | Self::Config(_)
            | Self::IdsExhausted { .. } => ErrorClass::Internal,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
