//! SQLite record store for mapshare.
//!
//! Persists datasets, things (places and submissions), audit actions,
//! attachments metadata, webhooks and access collaborators, and maintains the
//! secondary index over thing blobs.
//!
//! # Architecture
//!
//! - Things are stored as opaque JSON text plus relational columns
//! - The index engine ([`index_engine`]) keeps one typed row per
//!   (thing, index spec) in `indexed_values`
//! - [`ThingQuery`] composes filters, including index predicates that are
//!   rewritten into subqueries over `indexed_values`
//! - Table modules expose plain functions over `&Connection`, so callers can
//!   group several writes into one transaction with [`RecordStore::write`]

mod codec;
mod error;
mod query;
mod schema;

pub mod access;
pub mod actions;
pub mod attachments;
pub mod datasets;
pub mod index_engine;
pub mod things;
pub mod users;
pub mod webhooks;

pub use error::{StorageError, StorageResult};
pub use index_engine::IndexedValue;
pub use query::{IndexFilter, ThingQuery};
pub use rusqlite::{Connection, Transaction};
pub use things::{StoredThing, ThingRef};

use std::path::Path;
use std::sync::{Arc, Mutex};

/// Shared handle to the SQLite database.
///
/// Cloning is cheap; clones share one connection and serialize access to it.
#[derive(Clone)]
pub struct RecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl RecordStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        Self::open_with_conn(Connection::open(path)?)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::open_with_conn(Connection::open_in_memory()?)
    }

    /// Wraps an existing connection, creating the schema if needed.
    pub fn open_with_conn(conn: Connection) -> StorageResult<Self> {
        schema::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection without a transaction.
    ///
    /// Generic over the error type so callers can run their own fallible
    /// logic alongside the table functions.
    pub fn read<T, E>(&self, f: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        f(&conn)
    }

    /// Runs `f` inside a transaction. Commits if `f` returns `Ok`, rolls back
    /// otherwise.
    pub fn write<T, E>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let mut conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let tx = conn.transaction().map_err(StorageError::from)?;
        let out = f(&tx)?;
        tx.commit().map_err(StorageError::from)?;
        Ok(out)
    }
}
