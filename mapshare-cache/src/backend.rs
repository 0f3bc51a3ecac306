//! Key-value backends.

use crate::{CacheError, CacheResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Storage behind a [`crate::Cache`]. All operations may fail; the cache
/// treats a failure as a miss.
pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Stores `value` until `ttl` has elapsed.
    fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    fn delete_many(&self, keys: &[String]) -> CacheResult<()>;

    /// Atomically increments the integer counter at `key` (missing counts as
    /// zero) and returns the new value. Counters never expire.
    fn incr(&self, key: &str) -> CacheResult<u64>;
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Number of [`CacheBackend::set`] calls between sweeps of expired entries.
pub const SWEEP_EVERY: usize = 64;

/// In-process backend with per-entry expiry.
///
/// Expired values are dropped when read and by a sweep every
/// [`SWEEP_EVERY`] writes. Generation counters are one small entry per
/// cache key ever invalidated and are kept for the life of the backend.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, Entry>>,
    writes: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| CacheError::Backend("memory backend lock poisoned".into()))
    }

    /// Number of entries held, counters and not yet swept values included.
    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Drops every expired entry and returns how many were dropped.
    pub fn purge_expired(&self) -> CacheResult<usize> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        Ok(before - entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheBackend for MemoryBackend {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        let live = entries.get(key).map(|entry| entry.is_live(now));
        match live {
            Some(true) => Ok(entries.get(key).map(|entry| entry.value.clone())),
            Some(false) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl);
        let mut entries = self.lock()?;
        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_EVERY == 0 {
            entries.retain(|_, entry| entry.is_live(now));
        }
        entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    fn delete_many(&self, keys: &[String]) -> CacheResult<()> {
        let mut entries = self.lock()?;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    fn incr(&self, key: &str) -> CacheResult<u64> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        let current = match entries.get(key) {
            Some(entry) if entry.is_live(now) => entry.value.parse::<u64>().map_err(|_| {
                CacheError::Backend(format!("value at {key:?} is not a counter"))
            })?,
            _ => 0,
        };
        let next = current + 1;
        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at: None,
            },
        );
        Ok(next)
    }
}
