//! Webhook configuration.

use crate::codec::{parsed, timestamp, ts};
use crate::StorageResult;
use mapshare_model::{Webhook, WebhookEvent};
use mapshare_types::{DatasetId, WebhookId};
use rusqlite::{params, Connection, Row};

fn from_row(row: &Row<'_>) -> rusqlite::Result<Webhook> {
    Ok(Webhook {
        id: parsed(row, 0)?,
        dataset: parsed(row, 1)?,
        submission_set: row.get(2)?,
        // `add` is the only event there is.
        event: WebhookEvent::Add,
        url: row.get(4)?,
        created_datetime: timestamp(row, 5)?,
        updated_datetime: timestamp(row, 6)?,
    })
}

pub fn insert(conn: &Connection, hook: &Webhook) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO webhooks (id, dataset_id, submission_set, event, url,
                               created_datetime, updated_datetime)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            hook.id.to_string(),
            hook.dataset.to_string(),
            hook.submission_set,
            hook.event.as_str(),
            hook.url,
            ts(&hook.created_datetime),
            ts(&hook.updated_datetime),
        ],
    )?;
    Ok(())
}

/// Webhooks on a dataset, optionally only those for one submission set.
pub fn for_dataset(
    conn: &Connection,
    dataset: DatasetId,
    submission_set: Option<&str>,
) -> StorageResult<Vec<Webhook>> {
    let mut stmt = conn.prepare(
        "SELECT id, dataset_id, submission_set, event, url, created_datetime, updated_datetime
         FROM webhooks WHERE dataset_id = ?1 AND (?2 IS NULL OR submission_set = ?2)
         ORDER BY created_datetime, id",
    )?;
    let rows = stmt.query_map(params![dataset.to_string(), submission_set], from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn delete(conn: &Connection, id: WebhookId) -> StorageResult<bool> {
    let changed = conn.execute("DELETE FROM webhooks WHERE id = ?1", params![id.to_string()])?;
    Ok(changed > 0)
}
