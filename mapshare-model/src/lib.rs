//! Entity model for mapshare.
//!
//! Defines the types every other crate agrees on:
//! - [`Dataset`]: a named collection owned by a [`User`]
//! - [`Thing`], [`Place`], [`Submission`]: submitted records carrying an
//!   opaque JSON blob
//! - [`IndexSpec`] / [`ExtractedValue`]: per-dataset indexed fields and the
//!   typed values extracted from blobs
//! - [`Action`], [`Attachment`], [`Webhook`]: audit, files and callbacks
//! - [`Origin`], [`ApiKey`]: access collaborators owned by a dataset
//! - [`FieldSchema`] / [`Cloneable`]: explicit field descriptors used to
//!   duplicate an entity with overrides
//!
//! The blob is kept as text everywhere except at the index extraction
//! boundary, where it is parsed once and turned into typed values.

mod access;
mod action;
mod attachment;
mod clone;
mod dataset;
mod error;
mod geometry;
mod index;
mod thing;
mod webhook;

pub use access::{ApiKey, DataPermission, Origin};
pub use action::{Action, ActionKind};
pub use attachment::{alternate_path, attachment_path, Attachment};
pub use clone::{
    clone_entity, Cloneable, FieldSchema, FieldValue, PLACE_SCHEMA, SUBMISSION_SCHEMA,
    THING_SCHEMA,
};
pub use dataset::{validate_slug, Dataset, User};
pub use error::{ModelError, ModelResult};
pub use geometry::{BoundingBox, Geometry};
pub use index::{field_pointer, ExtractedValue, IndexOp, IndexSpec, IndexType};
pub use thing::{Place, Submission, SubmittedThing, Thing, ThingKind};
pub use webhook::{Webhook, WebhookEvent};
