use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("invalid inline image: {0}")]
    InvalidImage(String),
}

pub type CodecResult<T> = Result<T, CodecError>;
