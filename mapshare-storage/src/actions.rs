//! Audit actions.
//!
//! Actions are append-only; there is no update function.

use crate::codec::{parsed, parsed_enum, timestamp, ts};
use crate::{things, StorageResult};
use mapshare_model::Action;
use mapshare_types::{DatasetId, ThingId, UserId};
use rusqlite::{params, Connection, Row};

const COLUMNS: &str = "a.id, a.thing_id, a.action, a.source, a.created_datetime";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Action> {
    Ok(Action {
        id: parsed(row, 0)?,
        thing: parsed(row, 1)?,
        kind: parsed_enum(row, 2)?,
        source: row.get(3)?,
        created_datetime: timestamp(row, 4)?,
    })
}

pub fn insert(conn: &Connection, action: &Action) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO actions (id, thing_id, action, source, created_datetime)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            action.id.to_string(),
            action.thing.to_string(),
            action.kind.as_str(),
            action.source,
            ts(&action.created_datetime),
        ],
    )?;
    Ok(())
}

/// Actions on one thing, newest first.
pub fn for_thing(conn: &Connection, thing: ThingId) -> StorageResult<Vec<Action>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM actions a WHERE a.thing_id = ?1
         ORDER BY a.created_datetime DESC, a.id DESC"
    ))?;
    let rows = stmt.query_map(params![thing.to_string()], from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Recent activity across a dataset's visible things, newest first.
pub fn for_dataset(conn: &Connection, dataset: DatasetId, limit: usize) -> StorageResult<Vec<Action>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM actions a JOIN things t ON t.id = a.thing_id
         WHERE t.dataset_id = ?1 AND t.visible = 1
         ORDER BY a.created_datetime DESC, a.id DESC LIMIT ?2"
    ))?;
    let rows = stmt.query_map(params![dataset.to_string(), limit as i64], from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn count_for_thing(conn: &Connection, thing: ThingId) -> StorageResult<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM actions WHERE thing_id = ?1",
        params![thing.to_string()],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

/// The submitter of the thing the action refers to.
pub fn submitter(conn: &Connection, action: &Action) -> StorageResult<Option<UserId>> {
    Ok(things::get_thing(conn, action.thing)?.and_then(|t| t.submitter))
}
