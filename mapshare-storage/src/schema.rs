//! Table definitions.

use crate::StorageResult;
use rusqlite::Connection;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS datasets (
        id TEXT PRIMARY KEY,
        owner_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        display_name TEXT NOT NULL,
        slug TEXT NOT NULL,
        UNIQUE(owner_id, slug)
    );

    CREATE TABLE IF NOT EXISTS index_specs (
        id TEXT PRIMARY KEY,
        dataset_id TEXT NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
        attr_name TEXT NOT NULL,
        attr_type TEXT NOT NULL,
        UNIQUE(dataset_id, attr_name)
    );

    CREATE TABLE IF NOT EXISTS things (
        id TEXT PRIMARY KEY,
        kind TEXT NOT NULL,
        dataset_id TEXT NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
        submitter_id TEXT REFERENCES users(id) ON DELETE SET NULL,
        data TEXT NOT NULL DEFAULT '{}',
        visible INTEGER NOT NULL DEFAULT 1,
        created_datetime TEXT NOT NULL,
        updated_datetime TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS things_dataset_kind ON things (dataset_id, kind, visible);
    CREATE INDEX IF NOT EXISTS things_updated ON things (updated_datetime);

    CREATE TABLE IF NOT EXISTS places (
        thing_id TEXT PRIMARY KEY REFERENCES things(id) ON DELETE CASCADE,
        geometry TEXT NOT NULL,
        min_x REAL,
        min_y REAL,
        max_x REAL,
        max_y REAL
    );

    CREATE TABLE IF NOT EXISTS submissions (
        thing_id TEXT PRIMARY KEY REFERENCES things(id) ON DELETE CASCADE,
        place_id TEXT NOT NULL REFERENCES places(thing_id) ON DELETE CASCADE,
        set_name TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS submissions_place_set ON submissions (place_id, set_name);

    CREATE TABLE IF NOT EXISTS indexed_values (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        index_id TEXT NOT NULL REFERENCES index_specs(id) ON DELETE CASCADE,
        thing_id TEXT NOT NULL REFERENCES things(id) ON DELETE CASCADE,
        num_value REAL,
        text_value TEXT,
        UNIQUE(index_id, thing_id)
    );
    CREATE INDEX IF NOT EXISTS indexed_values_num ON indexed_values (index_id, num_value);
    CREATE INDEX IF NOT EXISTS indexed_values_text ON indexed_values (index_id, text_value);
    CREATE INDEX IF NOT EXISTS indexed_values_thing ON indexed_values (thing_id);

    CREATE TABLE IF NOT EXISTS actions (
        id TEXT PRIMARY KEY,
        thing_id TEXT NOT NULL REFERENCES things(id) ON DELETE CASCADE,
        action TEXT NOT NULL,
        source TEXT,
        created_datetime TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS actions_thing ON actions (thing_id, created_datetime);

    CREATE TABLE IF NOT EXISTS attachments (
        id TEXT PRIMARY KEY,
        thing_id TEXT NOT NULL REFERENCES things(id) ON DELETE CASCADE,
        name TEXT,
        file TEXT NOT NULL,
        created_datetime TEXT NOT NULL,
        updated_datetime TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS webhooks (
        id TEXT PRIMARY KEY,
        dataset_id TEXT NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
        submission_set TEXT NOT NULL,
        event TEXT NOT NULL,
        url TEXT NOT NULL,
        created_datetime TEXT NOT NULL,
        updated_datetime TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS origins (
        id TEXT PRIMARY KEY,
        dataset_id TEXT NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
        pattern TEXT NOT NULL,
        submission_set TEXT NOT NULL,
        can_retrieve INTEGER NOT NULL,
        can_create INTEGER NOT NULL,
        can_update INTEGER NOT NULL,
        can_destroy INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS api_keys (
        id TEXT PRIMARY KEY,
        dataset_id TEXT NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
        key TEXT NOT NULL UNIQUE,
        submission_set TEXT NOT NULL,
        can_retrieve INTEGER NOT NULL,
        can_create INTEGER NOT NULL,
        can_update INTEGER NOT NULL,
        can_destroy INTEGER NOT NULL
    );
";

/// Enables foreign keys and creates any missing tables.
pub(crate) fn init(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
