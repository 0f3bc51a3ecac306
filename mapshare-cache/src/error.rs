//! Error types for the cache layer.

use thiserror::Error;

pub type CacheResult<T> = Result<T, CacheError>;

/// Cache errors. [`crate::Cache`] never surfaces these to callers; they are
/// logged and the operation degrades to a miss.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
