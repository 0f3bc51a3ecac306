//! Access collaborators: allowed origins and API keys.
//!
//! Both carry one [`DataPermission`] row inline.

use crate::codec::parsed;
use crate::{StorageError, StorageResult};
use mapshare_model::{ApiKey, DataPermission, Origin};
use mapshare_types::{ApiKeyId, DatasetId, OriginId};
use rusqlite::{params, Connection, OptionalExtension, Row};

const PERMISSION_COLUMNS: &str = "submission_set, can_retrieve, can_create, can_update, can_destroy";

fn permission_from_row(row: &Row<'_>, start: usize) -> rusqlite::Result<DataPermission> {
    Ok(DataPermission {
        submission_set: row.get(start)?,
        can_retrieve: row.get(start + 1)?,
        can_create: row.get(start + 2)?,
        can_update: row.get(start + 3)?,
        can_destroy: row.get(start + 4)?,
    })
}

// ── Origins ──────────────────────────────────────────────────────

fn origin_from_row(row: &Row<'_>) -> rusqlite::Result<Origin> {
    Ok(Origin {
        id: parsed(row, 0)?,
        dataset: parsed(row, 1)?,
        pattern: row.get(2)?,
        permissions: permission_from_row(row, 3)?,
    })
}

pub fn insert_origin(conn: &Connection, origin: &Origin) -> StorageResult<()> {
    let p = &origin.permissions;
    conn.execute(
        &format!(
            "INSERT INTO origins (id, dataset_id, pattern, {PERMISSION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        ),
        params![
            origin.id.to_string(),
            origin.dataset.to_string(),
            origin.pattern,
            p.submission_set,
            p.can_retrieve,
            p.can_create,
            p.can_update,
            p.can_destroy,
        ],
    )?;
    Ok(())
}

pub fn origins_for_dataset(conn: &Connection, dataset: DatasetId) -> StorageResult<Vec<Origin>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, dataset_id, pattern, {PERMISSION_COLUMNS} FROM origins
         WHERE dataset_id = ?1 ORDER BY pattern, id"
    ))?;
    let rows = stmt.query_map(params![dataset.to_string()], origin_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// The first origin on `dataset` whose pattern matches the request's
/// `Origin` header.
pub fn matching_origin(
    conn: &Connection,
    dataset: DatasetId,
    origin_header: &str,
) -> StorageResult<Option<Origin>> {
    Ok(origins_for_dataset(conn, dataset)?
        .into_iter()
        .find(|o| Origin::matches(&o.pattern, origin_header)))
}

pub fn update_origin_permissions(
    conn: &Connection,
    id: OriginId,
    permissions: &DataPermission,
) -> StorageResult<()> {
    let changed = conn.execute(
        "UPDATE origins SET submission_set = ?2, can_retrieve = ?3, can_create = ?4,
                            can_update = ?5, can_destroy = ?6
         WHERE id = ?1",
        params![
            id.to_string(),
            permissions.submission_set,
            permissions.can_retrieve,
            permissions.can_create,
            permissions.can_update,
            permissions.can_destroy,
        ],
    )?;
    if changed == 0 {
        return Err(StorageError::not_found("origin", id));
    }
    Ok(())
}

pub fn delete_origin(conn: &Connection, id: OriginId) -> StorageResult<bool> {
    let changed = conn.execute("DELETE FROM origins WHERE id = ?1", params![id.to_string()])?;
    Ok(changed > 0)
}

// ── API keys ─────────────────────────────────────────────────────

fn key_from_row(row: &Row<'_>) -> rusqlite::Result<ApiKey> {
    Ok(ApiKey {
        id: parsed(row, 0)?,
        dataset: parsed(row, 1)?,
        key: row.get(2)?,
        permissions: permission_from_row(row, 3)?,
    })
}

pub fn insert_key(conn: &Connection, key: &ApiKey) -> StorageResult<()> {
    let p = &key.permissions;
    conn.execute(
        &format!(
            "INSERT INTO api_keys (id, dataset_id, key, {PERMISSION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        ),
        params![
            key.id.to_string(),
            key.dataset.to_string(),
            key.key,
            p.submission_set,
            p.can_retrieve,
            p.can_create,
            p.can_update,
            p.can_destroy,
        ],
    )?;
    Ok(())
}

pub fn key_by_value(conn: &Connection, key: &str) -> StorageResult<Option<ApiKey>> {
    Ok(conn
        .query_row(
            &format!("SELECT id, dataset_id, key, {PERMISSION_COLUMNS} FROM api_keys WHERE key = ?1"),
            params![key],
            key_from_row,
        )
        .optional()?)
}

pub fn keys_for_dataset(conn: &Connection, dataset: DatasetId) -> StorageResult<Vec<ApiKey>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, dataset_id, key, {PERMISSION_COLUMNS} FROM api_keys
         WHERE dataset_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt.query_map(params![dataset.to_string()], key_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn delete_key(conn: &Connection, id: ApiKeyId) -> StorageResult<bool> {
    let changed = conn.execute("DELETE FROM api_keys WHERE id = ?1", params![id.to_string()])?;
    Ok(changed > 0)
}
