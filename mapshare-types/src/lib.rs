//! Core type definitions for mapshare.
//!
//! This crate defines the small, dependency-light types every other crate
//! shares:
//! - Entity identifiers (UUID v7 newtypes, one per entity kind)
//! - UTC timestamps and the base62 time encoding used for attachment paths
//!
//! Nothing in here knows about datasets, blobs or caches.

mod ids;
mod time;

pub use ids::{
    ActionId, ApiKeyId, AttachmentId, DatasetId, IndexSpecId, OriginId, ThingId, UserId,
    WebhookId,
};
pub use time::{base62_encode, base62_time, now, parse_timestamp, Timestamp, BASE62_ALPHABET};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
