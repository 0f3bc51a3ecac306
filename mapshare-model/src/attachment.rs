use mapshare_types::{base62_time, now, AttachmentId, ThingId, Timestamp};
use serde::{Deserialize, Serialize};

/// Metadata for a file bound to a thing. The bytes live in attachment
/// storage under `file`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub thing: ThingId,
    pub name: Option<String>,
    pub file: String,
    pub created_datetime: Timestamp,
    pub updated_datetime: Timestamp,
}

impl Attachment {
    /// New attachment metadata, with the storage path generated from the
    /// current time and `filename`.
    pub fn new(thing: ThingId, name: Option<String>, filename: &str) -> Self {
        let at = now();
        Self {
            id: AttachmentId::new(),
            thing,
            name,
            file: attachment_path(filename, at),
            created_datetime: at,
            updated_datetime: at,
        }
    }
}

/// `attachments/<base62 time>-<filename>`.
///
/// Only the final component of `filename` is kept, so client-supplied names
/// can never climb out of the attachments prefix.
pub fn attachment_path(filename: &str, at: Timestamp) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or("file");
    format!("attachments/{}-{}", base62_time(at), base)
}

/// `path` with `_<attempt>` inserted before the file extension, for when the
/// generated path is already taken.
///
/// `attachments/k-photo.jpg` becomes `attachments/k-photo_2.jpg`.
pub fn alternate_path(path: &str, attempt: u32) -> String {
    let (dir, file) = match path.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, path),
    };
    let renamed = match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{attempt}.{ext}"),
        _ => format!("{file}_{attempt}"),
    };
    match dir {
        Some(dir) => format!("{dir}/{renamed}"),
        None => renamed,
    }
}
