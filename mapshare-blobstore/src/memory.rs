use crate::{validate_path, AttachmentStorage, BlobStoreError, BlobStoreResult, StoredBlob};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io;
use std::sync::{Mutex, MutexGuard};

/// Keeps attachments in a map. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryAttachmentStorage {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryAttachmentStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn blobs(&self) -> BlobStoreResult<MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.blobs
            .lock()
            .map_err(|_| BlobStoreError::Io(io::Error::other("attachment map lock poisoned")))
    }

    /// Stored paths, sorted.
    pub fn paths(&self) -> BlobStoreResult<Vec<String>> {
        let mut paths: Vec<String> = self.blobs()?.keys().cloned().collect();
        paths.sort();
        Ok(paths)
    }
}

impl AttachmentStorage for MemoryAttachmentStorage {
    fn put(&self, path: &str, data: &[u8]) -> BlobStoreResult<StoredBlob> {
        validate_path(path)?;
        match self.blobs()?.entry(path.to_string()) {
            Entry::Occupied(_) => Err(BlobStoreError::AlreadyExists(path.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(data.to_vec());
                Ok(StoredBlob::describe(path, data))
            }
        }
    }

    fn get(&self, path: &str) -> BlobStoreResult<Vec<u8>> {
        validate_path(path)?;
        self.blobs()?
            .get(path)
            .cloned()
            .ok_or_else(|| BlobStoreError::NotFound(path.to_string()))
    }

    fn delete(&self, path: &str) -> BlobStoreResult<()> {
        validate_path(path)?;
        self.blobs()?
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| BlobStoreError::NotFound(path.to_string()))
    }
}
