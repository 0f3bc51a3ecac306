//! Callbacks run when a dataset is created.
//!
//! Hooks run inside the transaction that inserts the dataset, so whatever
//! they write commits or rolls back together with it.

use crate::config::OriginPermissions;
use crate::CoreResult;
use mapshare_model::{DataPermission, Dataset, Origin};
use mapshare_storage::{access, Connection, StorageError};
use tracing::debug;

pub trait DatasetHook: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    fn on_dataset_created(&self, conn: &Connection, dataset: &Dataset) -> CoreResult<()>;
}

/// Grants a fixed set of origin patterns access to every new dataset.
#[derive(Debug, Clone)]
pub struct SeedDefaultOrigins {
    pub patterns: Vec<String>,
    pub permissions: OriginPermissions,
}

impl SeedDefaultOrigins {
    pub fn new(patterns: Vec<String>, permissions: OriginPermissions) -> Self {
        Self {
            patterns,
            permissions,
        }
    }
}

impl DatasetHook for SeedDefaultOrigins {
    fn name(&self) -> &'static str {
        "seed_default_origins"
    }

    fn on_dataset_created(&self, conn: &Connection, dataset: &Dataset) -> CoreResult<()> {
        seed_default_origins(conn, dataset, &self.patterns, &self.permissions.to_permission())?;
        Ok(())
    }
}

/// Inserts one origin per pattern on `dataset`, each with `permissions`.
pub fn seed_default_origins(
    conn: &Connection,
    dataset: &Dataset,
    patterns: &[String],
    permissions: &DataPermission,
) -> CoreResult<Vec<Origin>> {
    let id = dataset
        .id
        .ok_or_else(|| StorageError::InvalidData("dataset has not been saved".into()))?;
    let mut seeded = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        let mut origin = Origin::new(id, pattern.as_str())?;
        origin.permissions = permissions.clone();
        access::insert_origin(conn, &origin)?;
        seeded.push(origin);
    }
    debug!(dataset = %id, origins = seeded.len(), "seeded default origins");
    Ok(seeded)
}
