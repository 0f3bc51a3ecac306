//! Attachment file storage for mapshare.
//!
//! Attachment metadata lives in the record store; the bytes live here, keyed
//! by the relative path generated for the attachment
//! (`attachments/<stamp>-<filename>`). Two backends are provided: a rooted
//! directory on disk and an in-memory map for tests.

mod error;
mod fs;
mod memory;

pub use error::{BlobStoreError, BlobStoreResult};
pub use fs::FsAttachmentStorage;
pub use memory::MemoryAttachmentStorage;

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Component, Path};

/// What was written by [`AttachmentStorage::put`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredBlob {
    pub path: String,
    pub size: u64,
    /// Hex-encoded SHA-256 of the content.
    pub content_hash: String,
}

impl StoredBlob {
    pub(crate) fn describe(path: &str, data: &[u8]) -> Self {
        Self {
            path: path.to_string(),
            size: data.len() as u64,
            content_hash: content_hash(data),
        }
    }
}

/// Storage for attachment bytes.
pub trait AttachmentStorage: Send + Sync {
    /// Writes `data` at `path`. Never replaces existing content: a taken
    /// path is [`BlobStoreError::AlreadyExists`].
    fn put(&self, path: &str, data: &[u8]) -> BlobStoreResult<StoredBlob>;

    fn get(&self, path: &str) -> BlobStoreResult<Vec<u8>>;

    fn delete(&self, path: &str) -> BlobStoreResult<()>;

    fn exists(&self, path: &str) -> BlobStoreResult<bool> {
        match self.get(path) {
            Ok(_) => Ok(true),
            Err(BlobStoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

pub fn content_hash(data: &[u8]) -> String {
    Sha256::digest(data).iter().map(|b| format!("{b:02x}")).collect()
}

/// Rejects absolute paths, `..`, and anything else that could escape the
/// storage root.
pub(crate) fn validate_path(path: &str) -> BlobStoreResult<()> {
    let invalid = || BlobStoreError::InvalidPath(path.to_string());
    if path.is_empty() || path.contains('\\') {
        return Err(invalid());
    }
    let mut components = Path::new(path).components().peekable();
    if components.peek().is_none() {
        return Err(invalid());
    }
    if components.all(|c| matches!(c, Component::Normal(_))) {
        Ok(())
    } else {
        Err(invalid())
    }
}
