use thiserror::Error;

pub type BlobStoreResult<T> = Result<T, BlobStoreError>;

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("attachment not found: {0}")]
    NotFound(String),

    #[error("attachment already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid attachment path: {0:?}")]
    InvalidPath(String),
}
