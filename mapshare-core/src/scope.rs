//! Per-request memoization of access lookups.

use crate::CoreResult;
use mapshare_model::{ApiKey, Origin};
use mapshare_storage::{access, RecordStore};
use mapshare_types::DatasetId;
use std::collections::HashMap;

/// Remembers API key and origin lookups for the lifetime of one request.
///
/// Create one per request with [`crate::DataLayer::request_scope`] and drop
/// it when the request ends. Nothing is shared between scopes.
pub struct RequestScope {
    store: RecordStore,
    keys: HashMap<(DatasetId, String), Option<ApiKey>>,
    origins: HashMap<(DatasetId, String), Option<Origin>>,
}

impl RequestScope {
    pub fn new(store: RecordStore) -> Self {
        Self {
            store,
            keys: HashMap::new(),
            origins: HashMap::new(),
        }
    }

    /// The API key with value `key`, if it belongs to `dataset`.
    pub fn get_key(&mut self, dataset: DatasetId, key: &str) -> CoreResult<Option<ApiKey>> {
        let slot = (dataset, key.to_string());
        if let Some(found) = self.keys.get(&slot) {
            return Ok(found.clone());
        }
        let found = self
            .store
            .read(|c| access::key_by_value(c, key))?
            .filter(|k| k.dataset == dataset);
        self.keys.insert(slot, found.clone());
        Ok(found)
    }

    /// The first origin on `dataset` matching the `Origin` header.
    pub fn get_origin(&mut self, dataset: DatasetId, header: &str) -> CoreResult<Option<Origin>> {
        let slot = (dataset, header.to_string());
        if let Some(found) = self.origins.get(&slot) {
            return Ok(found.clone());
        }
        let found = self
            .store
            .read(|c| access::matching_origin(c, dataset, header))?;
        self.origins.insert(slot, found.clone());
        Ok(found)
    }
}
