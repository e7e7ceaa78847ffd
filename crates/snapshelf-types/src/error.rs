use thiserror::Error;

/// Input validation failures, raised before any I/O happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("title is required")]
    EmptyTitle,

    #[error("comment content is required")]
    EmptyComment,

    #[error("image payload is required")]
    EmptyImage,

    #[error("invalid record id: {0}")]
    InvalidId(String),
}
