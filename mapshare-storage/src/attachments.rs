//! Attachment metadata. The bytes live in attachment storage.

use crate::codec::{parsed, timestamp, ts};
use crate::StorageResult;
use mapshare_model::Attachment;
use mapshare_types::{AttachmentId, ThingId};
use rusqlite::{params, Connection, OptionalExtension, Row};

const COLUMNS: &str = "id, thing_id, name, file, created_datetime, updated_datetime";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Attachment> {
    Ok(Attachment {
        id: parsed(row, 0)?,
        thing: parsed(row, 1)?,
        name: row.get(2)?,
        file: row.get(3)?,
        created_datetime: timestamp(row, 4)?,
        updated_datetime: timestamp(row, 5)?,
    })
}

pub fn insert(conn: &Connection, attachment: &Attachment) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO attachments (id, thing_id, name, file, created_datetime, updated_datetime)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            attachment.id.to_string(),
            attachment.thing.to_string(),
            attachment.name,
            attachment.file,
            ts(&attachment.created_datetime),
            ts(&attachment.updated_datetime),
        ],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, id: AttachmentId) -> StorageResult<Option<Attachment>> {
    Ok(conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM attachments WHERE id = ?1"),
            params![id.to_string()],
            from_row,
        )
        .optional()?)
}

pub fn for_thing(conn: &Connection, thing: ThingId) -> StorageResult<Vec<Attachment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM attachments WHERE thing_id = ?1 ORDER BY created_datetime, id"
    ))?;
    let rows = stmt.query_map(params![thing.to_string()], from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Storage paths of every attachment owned by `thing` or, for a place, by
/// its submissions.
pub fn files_under(conn: &Connection, thing: ThingId) -> StorageResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT file FROM attachments
         WHERE thing_id = ?1
            OR thing_id IN (SELECT thing_id FROM submissions WHERE place_id = ?1)
         ORDER BY file",
    )?;
    let rows = stmt.query_map(params![thing.to_string()], |row| row.get(0))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn delete(conn: &Connection, id: AttachmentId) -> StorageResult<bool> {
    let changed = conn.execute("DELETE FROM attachments WHERE id = ?1", params![id.to_string()])?;
    Ok(changed > 0)
}
