use mapshare_blobstore::BlobStoreError;
use mapshare_model::ModelError;
use mapshare_storage::StorageError;
use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Attachment(#[from] BlobStoreError),

    #[error("config error: {0}")]
    Config(String),

    /// A dataset-created hook rejected the dataset.
    #[error("hook {hook} failed: {message}")]
    Hook { hook: &'static str, message: String },
}
