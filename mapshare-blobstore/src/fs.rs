use crate::{validate_path, AttachmentStorage, BlobStoreError, BlobStoreResult, StoredBlob};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

static PARTIAL_SEQ: AtomicU64 = AtomicU64::new(0);

/// Stores attachments as files under a root directory.
#[derive(Debug, Clone)]
pub struct FsAttachmentStorage {
    root: PathBuf,
}

impl FsAttachmentStorage {
    /// Uses `root`, creating it if needed.
    pub fn new(root: impl Into<PathBuf>) -> BlobStoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> BlobStoreResult<PathBuf> {
        validate_path(path)?;
        Ok(self.root.join(path))
    }
}

fn not_found(path: &str) -> impl FnOnce(io::Error) -> BlobStoreError + '_ {
    move |err| match err.kind() {
        ErrorKind::NotFound => BlobStoreError::NotFound(path.to_string()),
        _ => BlobStoreError::Io(err),
    }
}

impl AttachmentStorage for FsAttachmentStorage {
    fn put(&self, path: &str, data: &[u8]) -> BlobStoreResult<StoredBlob> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write aside, then hard-link into place: readers never see a
        // partial file and an existing target is never replaced.
        let mut partial = target.clone().into_os_string();
        partial.push(format!(
            ".{}-{}.partial",
            std::process::id(),
            PARTIAL_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&partial, data)?;
        let linked = fs::hard_link(&partial, &target);
        if let Err(err) = fs::remove_file(&partial) {
            debug!(error = %err, "failed to remove partial attachment");
        }
        match linked {
            Ok(()) => {
                debug!(path, size = data.len(), "stored attachment");
                Ok(StoredBlob::describe(path, data))
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                Err(BlobStoreError::AlreadyExists(path.to_string()))
            }
            Err(err) => Err(BlobStoreError::Io(err)),
        }
    }

    fn get(&self, path: &str) -> BlobStoreResult<Vec<u8>> {
        let target = self.resolve(path)?;
        fs::read(&target).map_err(not_found(path))
    }

    fn delete(&self, path: &str) -> BlobStoreResult<()> {
        let target = self.resolve(path)?;
        fs::remove_file(&target).map_err(not_found(path))?;
        debug!(path, "deleted attachment");
        Ok(())
    }
}
