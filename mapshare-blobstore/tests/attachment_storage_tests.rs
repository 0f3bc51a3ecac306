use mapshare_blobstore::{
    content_hash, AttachmentStorage, BlobStoreError, FsAttachmentStorage, MemoryAttachmentStorage,
};
use pretty_assertions::assert_eq;

fn backends(dir: &tempfile::TempDir) -> Vec<(&'static str, Box<dyn AttachmentStorage>)> {
    let memory: Box<dyn AttachmentStorage> = Box::new(MemoryAttachmentStorage::new());
    let fs: Box<dyn AttachmentStorage> =
        Box::new(FsAttachmentStorage::new(dir.path().join("media")).unwrap());
    vec![("memory", memory), ("fs", fs)]
}

// ── Error type coverage ─────────────────────────────────────────
#[test]
fn error_display() {
    let err = BlobStoreError::NotFound("attachments/x.png".to_string());
    assert!(format!("{err}").contains("attachments/x.png"));

    let err = BlobStoreError::InvalidPath("../etc/passwd".to_string());
    assert!(format!("{err}").contains("../etc/passwd"));

    let err = BlobStoreError::AlreadyExists("attachments/a.png".to_string());
    assert!(format!("{err}").contains("already exists"));
}

#[test]
fn error_debug() {
    let err = BlobStoreError::NotFound("p".to_string());
    assert!(format!("{err:?}").contains("NotFound"));
}

// ── Put / get / delete ──────────────────────────────────────────
#[test]
fn put_and_get() {
    let dir = tempfile::tempdir().unwrap();
    for (name, store) in backends(&dir) {
        let stored = store.put("attachments/abc-photo.jpg", b"jpeg data").unwrap();
        assert_eq!(stored.size, 9, "{name}");
        assert_eq!(store.get("attachments/abc-photo.jpg").unwrap(), b"jpeg data", "{name}");
        assert!(store.exists("attachments/abc-photo.jpg").unwrap(), "{name}");
    }
}

#[test]
fn put_never_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    for (name, store) in backends(&dir) {
        store.put("attachments/a.txt", b"v1").unwrap();
        let err = store.put("attachments/a.txt", b"v2 updated").unwrap_err();
        assert!(matches!(err, BlobStoreError::AlreadyExists(ref p) if p == "attachments/a.txt"), "{name}");
        assert_eq!(store.get("attachments/a.txt").unwrap(), b"v1", "{name}");
    }
}

#[test]
fn put_after_delete_is_allowed() {
    let dir = tempfile::tempdir().unwrap();
    for (name, store) in backends(&dir) {
        store.put("attachments/r.txt", b"first").unwrap();
        store.delete("attachments/r.txt").unwrap();
        store.put("attachments/r.txt", b"second").unwrap();
        assert_eq!(store.get("attachments/r.txt").unwrap(), b"second", "{name}");
    }
}

#[test]
fn missing_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    for (name, store) in backends(&dir) {
        assert!(
            matches!(store.get("attachments/nope"), Err(BlobStoreError::NotFound(_))),
            "{name}"
        );
        assert!(
            matches!(store.delete("attachments/nope"), Err(BlobStoreError::NotFound(_))),
            "{name}"
        );
        assert!(!store.exists("attachments/nope").unwrap(), "{name}");
    }
}

#[test]
fn delete_removes() {
    let dir = tempfile::tempdir().unwrap();
    for (name, store) in backends(&dir) {
        store.put("attachments/d.bin", b"data").unwrap();
        store.delete("attachments/d.bin").unwrap();
        assert!(!store.exists("attachments/d.bin").unwrap(), "{name}");
    }
}

#[test]
fn escaping_paths_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    for (name, store) in backends(&dir) {
        for path in ["", "/etc/passwd", "../outside", "attachments/../../x", "a\\b"] {
            assert!(
                matches!(store.put(path, b"x"), Err(BlobStoreError::InvalidPath(_))),
                "{name}: {path:?}"
            );
        }
    }
}

// ── Hashing ─────────────────────────────────────────────────────
#[test]
fn content_hash_is_sha256() {
    use sha2::{Digest, Sha256};
    let store = MemoryAttachmentStorage::new();
    let data = b"test data for hashing";
    let stored = store.put("attachments/h", data).unwrap();

    let expected: String = Sha256::digest(data).iter().map(|b| format!("{b:02x}")).collect();
    assert_eq!(stored.content_hash, expected);
    assert_eq!(content_hash(data), expected);
}

#[test]
fn stored_blob_serializes() {
    let store = MemoryAttachmentStorage::new();
    let stored = store.put("attachments/s", b"ser test").unwrap();
    let json = serde_json::to_string(&stored).unwrap();
    assert!(json.contains("attachments/s"));
    assert!(json.contains("content_hash"));
}

// ── Filesystem layout ───────────────────────────────────────────
#[test]
fn fs_writes_under_root() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsAttachmentStorage::new(dir.path()).unwrap();
    store.put("attachments/k-map.png", b"png").unwrap();

    let on_disk = std::fs::read(dir.path().join("attachments/k-map.png")).unwrap();
    assert_eq!(on_disk, b"png");
    let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("attachments"))
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers.len(), 1);
}

#[test]
fn fs_rejected_put_leaves_no_partial_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsAttachmentStorage::new(dir.path()).unwrap();
    store.put("attachments/same.png", b"one").unwrap();
    assert!(store.put("attachments/same.png", b"two").is_err());

    let names: Vec<_> = std::fs::read_dir(dir.path().join("attachments"))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["same.png".to_string()]);
}

#[test]
fn fs_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    FsAttachmentStorage::new(dir.path()).unwrap().put("attachments/keep", b"kept").unwrap();
    let reopened = FsAttachmentStorage::new(dir.path()).unwrap();
    assert_eq!(reopened.get("attachments/keep").unwrap(), b"kept");
}

#[test]
fn memory_lists_paths() {
    let store = MemoryAttachmentStorage::new();
    store.put("attachments/b", b"").unwrap();
    store.put("attachments/a", b"").unwrap();
    assert_eq!(store.paths().unwrap(), vec!["attachments/a", "attachments/b"]);
}
