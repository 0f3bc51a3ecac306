//! Read-through cache for mapshare with hierarchical invalidation.
//!
//! Values are cached per [`CacheTarget`] and a free-form variant (for example
//! a serialized representation with or without private fields). Each key has a
//! generation counter in the backend. Reads look up the generation first and
//! store under it; [`Cache::clear`] bumps the generation of the target and of
//! every ancestor. A value computed before a clear therefore lands under a
//! stale generation and is never served after it.
//!
//! The cache is best effort. A backend failure turns a read into a recompute
//! and a clear into a warning.

mod backend;
mod descriptor;
mod error;

pub use backend::{CacheBackend, MemoryBackend, SWEEP_EVERY};
pub use descriptor::{descriptor_for, CacheDescriptor, CacheTarget, EntityKind, ThingChain};
pub use error::{CacheError, CacheResult};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Default lifetime of a cached value.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

fn generation_key(key: &str) -> String {
    format!("gen:{key}")
}

fn value_key(key: &str, generation: u64, variant: &str) -> String {
    format!("{key}@{generation}/{variant}")
}

/// Shared cache handle. Cloning shares the backend.
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
    /// Variants stored per key since its last clear, so the clear can
    /// delete them.
    variants: Arc<Mutex<HashMap<String, BTreeSet<String>>>>,
}

impl Cache {
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self {
            backend,
            ttl,
            variants: Arc::default(),
        }
    }

    /// A cache over a fresh [`MemoryBackend`].
    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(Arc::new(MemoryBackend::new()), ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn generation(&self, key: &str) -> CacheResult<u64> {
        match self.backend.get(&generation_key(key))? {
            Some(raw) => raw
                .parse()
                .map_err(|_| CacheError::Backend(format!("bad generation for {key:?}: {raw:?}"))),
            None => Ok(0),
        }
    }

    fn lookup<T: DeserializeOwned>(&self, value_key: &str) -> CacheResult<Option<T>> {
        match self.backend.get(value_key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn store<T: Serialize>(&self, key: &str, value_key: &str, variant: &str, value: &T) -> CacheResult<()> {
        let raw = serde_json::to_string(value)?;
        self.backend.set(value_key, raw, self.ttl)?;
        if let Ok(mut variants) = self.variants.lock() {
            variants.entry(key.to_string()).or_default().insert(variant.to_string());
        }
        Ok(())
    }

    /// Returns the cached `variant` of `target`, or computes, stores and
    /// returns it. Errors from `compute` pass through; cache errors never do.
    pub fn get_or_set<T, E, F>(&self, target: &CacheTarget, variant: &str, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, E>,
    {
        let key = descriptor_for(target.kind()).compute_key(target);
        let generation = match self.generation(&key) {
            Ok(generation) => generation,
            Err(err) => {
                warn!(key = %key, error = %err, "cache unavailable, computing uncached");
                return compute();
            }
        };

        let vkey = value_key(&key, generation, variant);
        match self.lookup(&vkey) {
            Ok(Some(value)) => {
                debug!(key = %vkey, "cache hit");
                return Ok(value);
            }
            Ok(None) => {}
            Err(err) => warn!(key = %vkey, error = %err, "cache read failed"),
        }

        let value = compute()?;
        if let Err(err) = self.store(&key, &vkey, variant, &value) {
            warn!(key = %vkey, error = %err, "cache write failed");
        }
        Ok(value)
    }

    /// Invalidates `target` and all of its ancestors.
    ///
    /// Call only after the write that motivated it is durable.
    pub fn clear(&self, target: &CacheTarget) {
        let keys = target.invalidation_keys();
        let mut stale = Vec::new();
        for key in &keys {
            match self.backend.incr(&generation_key(key)) {
                Ok(generation) => {
                    if let Ok(mut variants) = self.variants.lock() {
                        for variant in variants.remove(key).into_iter().flatten() {
                            stale.push(value_key(key, generation - 1, &variant));
                        }
                    }
                }
                Err(err) => warn!(key = %key, error = %err, "failed to invalidate cache key"),
            }
        }
        if !stale.is_empty() {
            if let Err(err) = self.backend.delete_many(&stale) {
                warn!(keys = stale.len(), error = %err, "failed to delete stale cache values");
            }
        }
        debug!(entity = %target.kind(), keys = keys.len(), "cleared cache");
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::in_memory(DEFAULT_TTL)
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapshare_types::DatasetId;
    use std::convert::Infallible;

    fn tracked(cache: &Cache) -> usize {
        cache.variants.lock().map(|v| v.len()).unwrap_or(usize::MAX)
    }

    #[test]
    fn clear_forgets_variants_it_has_deleted() {
        let cache = Cache::default();
        let target = CacheTarget::Dataset(DatasetId::new());
        cache.get_or_set(&target, "json", || Ok::<_, Infallible>(1u8)).unwrap();
        assert_eq!(tracked(&cache), 1);

        cache.clear(&target);
        assert_eq!(tracked(&cache), 0);
    }
}
