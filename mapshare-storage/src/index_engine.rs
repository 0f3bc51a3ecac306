//! Secondary indexes over thing blobs.
//!
//! Each dataset declares [`IndexSpec`]s. For every (thing, spec) pair the
//! engine keeps exactly one row in `indexed_values` holding the value
//! extracted from the thing's blob, numeric values in `num_value` and text in
//! `text_value`. Rows are upserted on `UNIQUE(index_id, thing_id)`, so
//! re-syncing never adds rows and concurrent reindexing ends with whichever
//! write landed last.
//!
//! A path that is missing from the blob, or holds something the index type
//! cannot represent, is stored as a row with both value columns null. The row
//! still exists, so "every pair has a row" holds regardless of blob content.
//!
//! Indexed values are derived state; the blob is always the source of truth.

use crate::codec::{parsed, parsed_enum};
use crate::{things, StorageError, StorageResult};
use mapshare_model::{ExtractedValue, IndexSpec, IndexType, Thing};
use mapshare_types::{DatasetId, IndexSpecId, ThingId};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use tracing::{debug, info};

/// One stored row of the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedValue {
    /// Row id. Stable across re-syncs of the same (thing, spec) pair.
    pub row_id: i64,
    pub index: IndexSpecId,
    pub thing: ThingId,
    /// `None` when extraction missed.
    pub value: Option<ExtractedValue>,
}

// ── Index specs ──────────────────────────────────────────────────

fn spec_from_row(row: &Row<'_>) -> rusqlite::Result<IndexSpec> {
    Ok(IndexSpec {
        id: parsed(row, 0)?,
        dataset: parsed(row, 1)?,
        attr_name: row.get(2)?,
        attr_type: parsed_enum(row, 3)?,
    })
}

pub fn create_spec(conn: &Connection, spec: &IndexSpec) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO index_specs (id, dataset_id, attr_name, attr_type) VALUES (?1, ?2, ?3, ?4)",
        params![
            spec.id.to_string(),
            spec.dataset.to_string(),
            spec.attr_name,
            spec.attr_type.as_str()
        ],
    )?;
    Ok(())
}

/// Every spec currently defined on `dataset`, ordered by field name.
pub fn specs_for_dataset(conn: &Connection, dataset: DatasetId) -> StorageResult<Vec<IndexSpec>> {
    let mut stmt = conn.prepare(
        "SELECT id, dataset_id, attr_name, attr_type FROM index_specs
         WHERE dataset_id = ?1 ORDER BY attr_name",
    )?;
    let rows = stmt.query_map(params![dataset.to_string()], spec_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn spec_by_name(
    conn: &Connection,
    dataset: DatasetId,
    attr_name: &str,
) -> StorageResult<Option<IndexSpec>> {
    Ok(conn
        .query_row(
            "SELECT id, dataset_id, attr_name, attr_type FROM index_specs
             WHERE dataset_id = ?1 AND attr_name = ?2",
            params![dataset.to_string(), attr_name],
            spec_from_row,
        )
        .optional()?)
}

/// Removes a spec and, by cascade, its indexed values.
pub fn delete_spec(conn: &Connection, id: IndexSpecId) -> StorageResult<bool> {
    let changed = conn.execute("DELETE FROM index_specs WHERE id = ?1", params![id.to_string()])?;
    Ok(changed > 0)
}

// ── Indexed values ───────────────────────────────────────────────

fn columns(value: Option<&ExtractedValue>) -> (Option<f64>, Option<&str>) {
    match value {
        Some(ExtractedValue::Numeric(n)) => (Some(*n), None),
        Some(ExtractedValue::Text(s)) | Some(ExtractedValue::Lookup(s)) => (None, Some(s)),
        None => (None, None),
    }
}

/// Extracts `spec`'s value from `blob` and upserts the (thing, spec) row.
///
/// Idempotent: syncing the same blob again leaves one row with the same
/// content and the same row id.
pub fn sync(conn: &Connection, thing: ThingId, spec: &IndexSpec, blob: &Value) -> StorageResult<()> {
    let extracted = spec.extract(blob);
    let (num_value, text_value) = columns(extracted.as_ref());
    conn.execute(
        "INSERT INTO indexed_values (index_id, thing_id, num_value, text_value)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(index_id, thing_id)
         DO UPDATE SET num_value = excluded.num_value, text_value = excluded.text_value",
        params![spec.id.to_string(), thing.to_string(), num_value, text_value],
    )?;
    Ok(())
}

/// Re-derives the indexed values of `thing` for `specs`, or for every spec
/// currently on the thing's dataset when `specs` is `None`.
///
/// Returns the number of specs synced. An empty spec set returns before
/// anything is parsed or written. The blob is parsed once per call.
pub fn index_values(
    conn: &Connection,
    thing: &Thing,
    specs: Option<&[IndexSpec]>,
) -> StorageResult<usize> {
    let loaded;
    let specs = match specs {
        Some(specs) => specs,
        None => {
            loaded = specs_for_dataset(conn, thing.dataset)?;
            &loaded
        }
    };
    if specs.is_empty() {
        return Ok(0);
    }

    let id = thing
        .id
        .ok_or_else(|| StorageError::InvalidData("cannot index an unsaved thing".into()))?;
    if let Some(foreign) = specs.iter().find(|s| s.dataset != thing.dataset) {
        return Err(StorageError::InvalidData(format!(
            "index {} belongs to dataset {}, thing {id} to {}",
            foreign.attr_name, foreign.dataset, thing.dataset
        )));
    }

    let blob = thing.parsed_data();
    for spec in specs {
        sync(conn, id, spec, &blob)?;
    }
    debug!(thing = %id, specs = specs.len(), "indexed thing");
    Ok(specs.len())
}

/// Re-derives indexed values for every thing in `dataset`. Returns the
/// number of things visited.
pub fn reindex_dataset(conn: &Connection, dataset: DatasetId) -> StorageResult<usize> {
    let specs = specs_for_dataset(conn, dataset)?;
    if specs.is_empty() {
        return Ok(0);
    }
    let ids = things::ids_in_dataset(conn, dataset)?;
    for id in &ids {
        if let Some(thing) = things::get_thing(conn, *id)? {
            index_values(conn, &thing, Some(&specs))?;
        }
    }
    info!(dataset = %dataset, things = ids.len(), specs = specs.len(), "reindexed dataset");
    Ok(ids.len())
}

/// The stored row for (thing, spec), if any.
pub fn indexed_value(
    conn: &Connection,
    thing: ThingId,
    spec: &IndexSpec,
) -> StorageResult<Option<IndexedValue>> {
    Ok(conn
        .query_row(
            "SELECT id, num_value, text_value FROM indexed_values
             WHERE index_id = ?1 AND thing_id = ?2",
            params![spec.id.to_string(), thing.to_string()],
            |row| {
                let row_id: i64 = row.get(0)?;
                let num: Option<f64> = row.get(1)?;
                let text: Option<String> = row.get(2)?;
                Ok(IndexedValue {
                    row_id,
                    index: spec.id,
                    thing,
                    value: typed(spec.attr_type, num, text),
                })
            },
        )
        .optional()?)
}

fn typed(attr_type: IndexType, num: Option<f64>, text: Option<String>) -> Option<ExtractedValue> {
    match attr_type {
        IndexType::Numeric => num.map(ExtractedValue::Numeric),
        IndexType::String => text.map(ExtractedValue::Text),
        IndexType::Lookup => text.map(ExtractedValue::Lookup),
    }
}

/// Number of index rows stored for a thing.
pub fn count_for_thing(conn: &Connection, thing: ThingId) -> StorageResult<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM indexed_values WHERE thing_id = ?1",
        params![thing.to_string()],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}
