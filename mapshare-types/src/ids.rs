//! Identifier types used throughout mapshare.
//!
//! Uses UUID v7 for time-ordered, globally unique identifiers. Each entity
//! kind gets its own newtype so a `ThingId` can never be handed to something
//! expecting a `DatasetId`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new identifier with the current timestamp.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an identifier from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }

            /// Parses an identifier from a string.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

entity_id!(
    /// Identifies a user (dataset owner or thing submitter).
    UserId
);

entity_id!(
    /// Identifies a dataset.
    DatasetId
);

entity_id!(
    /// Identifies a submitted thing. Places and submissions share this id
    /// space, since both are things.
    ThingId
);

entity_id!(
    /// Identifies a per-dataset index spec.
    IndexSpecId
);

entity_id!(
    /// Identifies an audit action.
    ActionId
);

entity_id!(
    /// Identifies an attachment.
    AttachmentId
);

entity_id!(
    /// Identifies a webhook.
    WebhookId
);

entity_id!(
    /// Identifies an allowed origin.
    OriginId
);

entity_id!(
    /// Identifies a dataset API key.
    ApiKeyId
);
