use thiserror::Error;

/// Largest slice of a response body kept on a [`BlobError::Status`].
pub const MAX_ERROR_BODY: usize = 512;

/// Errors from object store operations.
///
/// URLs carried here are always redacted: the capability token is removed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlobError {
    /// The object does not exist (HTTP 404).
    #[error("blob not found: {url}")]
    NotFound { url: String },

    /// Any other non-2xx response.
    #[error("object store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never produced a response (connect, timeout, body read).
    #[error("request failed: {0}")]
    Request(String),

    /// A capability URL could not be split into root, blob name, and token.
    #[error("malformed capability url: {0}")]
    MalformedUrl(String),
}

impl BlobError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Build a status error, truncating the body on a char boundary.
    pub fn status(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            body: truncate_body(body, MAX_ERROR_BODY),
        }
    }
}

fn truncate_body(body: &str, limit: usize) -> String {
    if body.len() <= limit {
        return body.to_string();
    }
    let mut end = limit;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

/// Result alias for blob operations.
pub type BlobResult<T> = Result<T, BlobError>;
