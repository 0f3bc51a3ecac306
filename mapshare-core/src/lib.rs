//! Entity lifecycle for mapshare.
//!
//! [`DataLayer`] ties the record store, index engine, cache and attachment
//! storage together. Callers save places and submissions through it and get
//! back the persisted entity; indexing, auditing and cache invalidation
//! happen as part of the save.
//!
//! ```no_run
//! use mapshare_core::{DataLayer, SaveOptions};
//! use mapshare_model::{Geometry, Place};
//! use serde_json::json;
//!
//! # fn main() -> mapshare_core::CoreResult<()> {
//! let layer = DataLayer::in_memory()?;
//! let owner = layer.create_user("admin")?;
//! let dataset = layer.create_dataset(owner.id, "Parks", "parks")?;
//! # let Some(id) = dataset.id else { return Ok(()) };
//! let place = Place::new(id, Geometry::Point([-73.97, 40.78]))
//!     .with_data(&json!({"name": "Central Park"}));
//! let place = layer.save_place(place, &SaveOptions::default())?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod hooks;
mod lifecycle;
mod scope;

pub use config::{MapshareConfig, OriginPermissions, DEFAULT_ORIGIN_PATTERNS};
pub use error::{CoreError, CoreResult};
pub use hooks::{seed_default_origins, DatasetHook, SeedDefaultOrigins};
pub use lifecycle::{CachedThing, DataLayer, SaveOptions};
pub use scope::RequestScope;
