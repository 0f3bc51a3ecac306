//! Datasets table.

use crate::codec::parsed;
use crate::{StorageError, StorageResult};
use mapshare_model::Dataset;
use mapshare_types::{DatasetId, UserId};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

const COLUMNS: &str = "id, owner_id, display_name, slug";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Dataset> {
    Ok(Dataset {
        id: Some(parsed(row, 0)?),
        owner: parsed(row, 1)?,
        display_name: row.get(2)?,
        slug: row.get(3)?,
    })
}

/// Inserts the dataset if it has no id yet, updates it otherwise. Returns
/// true when a row was inserted.
pub fn persist(conn: &Connection, dataset: &mut Dataset) -> StorageResult<bool> {
    match dataset.id {
        None => {
            let id = DatasetId::new();
            conn.execute(
                "INSERT INTO datasets (id, owner_id, display_name, slug) VALUES (?1, ?2, ?3, ?4)",
                params![
                    id.to_string(),
                    dataset.owner.to_string(),
                    dataset.display_name,
                    dataset.slug
                ],
            )?;
            dataset.id = Some(id);
            debug!(dataset = %id, slug = %dataset.slug, "inserted dataset");
            Ok(true)
        }
        Some(id) => {
            let changed = conn.execute(
                "UPDATE datasets SET owner_id = ?2, display_name = ?3, slug = ?4 WHERE id = ?1",
                params![
                    id.to_string(),
                    dataset.owner.to_string(),
                    dataset.display_name,
                    dataset.slug
                ],
            )?;
            if changed == 0 {
                return Err(StorageError::not_found("dataset", id));
            }
            Ok(false)
        }
    }
}

pub fn get(conn: &Connection, id: DatasetId) -> StorageResult<Option<Dataset>> {
    Ok(conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM datasets WHERE id = ?1"),
            params![id.to_string()],
            from_row,
        )
        .optional()?)
}

/// Like [`get`], but a missing dataset is an error.
pub fn require(conn: &Connection, id: DatasetId) -> StorageResult<Dataset> {
    get(conn, id)?.ok_or_else(|| StorageError::not_found("dataset", id))
}

pub fn get_by_slug(conn: &Connection, owner: UserId, slug: &str) -> StorageResult<Option<Dataset>> {
    Ok(conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM datasets WHERE owner_id = ?1 AND slug = ?2"),
            params![owner.to_string(), slug],
            from_row,
        )
        .optional()?)
}

pub fn list_for_owner(conn: &Connection, owner: UserId) -> StorageResult<Vec<Dataset>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {COLUMNS} FROM datasets WHERE owner_id = ?1 ORDER BY slug"))?;
    let rows = stmt.query_map(params![owner.to_string()], from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Deletes the dataset and, by cascade, everything it owns.
pub fn delete(conn: &Connection, id: DatasetId) -> StorageResult<bool> {
    let changed = conn.execute("DELETE FROM datasets WHERE id = ?1", params![id.to_string()])?;
    Ok(changed > 0)
}
