//! Things, places and submissions.
//!
//! A place or submission is one row in `things` plus one row in its kind
//! table keyed by the same id. Both rows are written by [`persist`].

use crate::codec::{json, parsed, parsed_enum, parsed_opt, timestamp, ts};
use crate::{StorageError, StorageResult};
use mapshare_model::{Place, Submission, SubmittedThing, Thing, ThingKind};
use mapshare_types::{now, DatasetId, ThingId};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

/// The seven `things` columns, in the order [`thing_from_row`] reads them.
pub(crate) const THING_COLUMNS: &str =
    "t.id, t.dataset_id, t.submitter_id, t.data, t.visible, t.created_datetime, t.updated_datetime";

fn thing_from_row(row: &Row<'_>) -> rusqlite::Result<Thing> {
    Ok(Thing {
        id: Some(parsed(row, 0)?),
        dataset: parsed(row, 1)?,
        submitter: parsed_opt(row, 2)?,
        data: row.get(3)?,
        visible: row.get(4)?,
        created_datetime: timestamp(row, 5)?,
        updated_datetime: timestamp(row, 6)?,
    })
}

/// A concrete thing type with its own kind table.
pub trait StoredThing: SubmittedThing + Sized {
    /// Join from `things t` to the kind table, aliased `k`.
    const JOIN: &'static str;

    /// Kind-table columns selected after [`THING_COLUMNS`].
    const EXTRA_COLUMNS: &'static str;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Writes the kind-table row for `id`.
    fn persist_extra(&self, conn: &Connection, id: ThingId, inserting: bool) -> StorageResult<()>;
}

impl StoredThing for Place {
    const JOIN: &'static str = "JOIN places k ON k.thing_id = t.id";
    const EXTRA_COLUMNS: &'static str = "k.geometry";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Place {
            thing: thing_from_row(row)?,
            geometry: json(row, 7)?,
        })
    }

    fn persist_extra(&self, conn: &Connection, id: ThingId, inserting: bool) -> StorageResult<()> {
        let geometry = serde_json::to_string(&self.geometry)?;
        let bbox = self.geometry.bbox();
        let (min_x, min_y, max_x, max_y) = match bbox {
            Some(b) => (Some(b.min_x), Some(b.min_y), Some(b.max_x), Some(b.max_y)),
            None => (None, None, None, None),
        };
        let sql = if inserting {
            "INSERT INTO places (thing_id, geometry, min_x, min_y, max_x, max_y)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
        } else {
            "UPDATE places SET geometry = ?2, min_x = ?3, min_y = ?4, max_x = ?5, max_y = ?6
             WHERE thing_id = ?1"
        };
        conn.execute(
            sql,
            params![id.to_string(), geometry, min_x, min_y, max_x, max_y],
        )?;
        Ok(())
    }
}

impl StoredThing for Submission {
    const JOIN: &'static str = "JOIN submissions k ON k.thing_id = t.id";
    const EXTRA_COLUMNS: &'static str = "k.place_id, k.set_name";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Submission {
            thing: thing_from_row(row)?,
            place: parsed(row, 7)?,
            set_name: row.get(8)?,
        })
    }

    fn persist_extra(&self, conn: &Connection, id: ThingId, inserting: bool) -> StorageResult<()> {
        let place_dataset: Option<DatasetId> = conn
            .query_row(
                "SELECT t.dataset_id FROM things t JOIN places k ON k.thing_id = t.id
                 WHERE t.id = ?1",
                params![self.place.to_string()],
                |row| parsed(row, 0),
            )
            .optional()?;
        match place_dataset {
            None => {
                return Err(StorageError::Constraint(format!(
                    "submission references missing place {}",
                    self.place
                )));
            }
            Some(ds) if ds != self.thing.dataset => {
                return Err(StorageError::Constraint(format!(
                    "place {} belongs to dataset {ds}, not {}",
                    self.place, self.thing.dataset
                )));
            }
            Some(_) => {}
        }
        let sql = if inserting {
            "INSERT INTO submissions (thing_id, place_id, set_name) VALUES (?1, ?2, ?3)"
        } else {
            "UPDATE submissions SET place_id = ?2, set_name = ?3 WHERE thing_id = ?1"
        };
        conn.execute(
            sql,
            params![id.to_string(), self.place.to_string(), self.set_name],
        )?;
        Ok(())
    }
}

/// Inserts the thing if it has no id yet, updates it otherwise.
///
/// Refreshes `updated_datetime`. The id is only assigned once both rows are
/// written. Returns true when a new row was inserted.
///
/// A stored thing never changes dataset: an update naming another dataset
/// is a [`StorageError::Constraint`].
pub fn persist<T: StoredThing>(conn: &Connection, record: &mut T) -> StorageResult<bool> {
    let inserting = record.thing().is_new();
    let id = record.thing().id.unwrap_or_else(ThingId::new);
    let updated = now();
    let t = record.thing();

    if inserting {
        conn.execute(
            "INSERT INTO things (id, kind, dataset_id, submitter_id, data, visible,
                                 created_datetime, updated_datetime)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id.to_string(),
                T::KIND.as_str(),
                t.dataset.to_string(),
                t.submitter.map(|s| s.to_string()),
                t.data,
                t.visible,
                ts(&t.created_datetime),
                ts(&updated),
            ],
        )?;
    } else {
        let stored_dataset: DatasetId = conn
            .query_row(
                "SELECT dataset_id FROM things WHERE id = ?1 AND kind = ?2",
                params![id.to_string(), T::KIND.as_str()],
                |row| parsed(row, 0),
            )
            .optional()?
            .ok_or_else(|| StorageError::not_found(T::KIND.as_str(), id))?;
        if stored_dataset != t.dataset {
            return Err(StorageError::Constraint(format!(
                "{} {id} belongs to dataset {stored_dataset}, cannot move it to {}",
                T::KIND,
                t.dataset
            )));
        }
        conn.execute(
            "UPDATE things SET submitter_id = ?2, data = ?3, visible = ?4,
                               created_datetime = ?5, updated_datetime = ?6
             WHERE id = ?1",
            params![
                id.to_string(),
                t.submitter.map(|s| s.to_string()),
                t.data,
                t.visible,
                ts(&t.created_datetime),
                ts(&updated),
            ],
        )?;
    }
    record.persist_extra(conn, id, inserting)?;

    let t = record.thing_mut();
    t.id = Some(id);
    t.updated_datetime = updated;
    let kind = T::KIND;
    debug!(thing = %id, kind = %kind, inserted = inserting, "persisted thing");
    Ok(inserting)
}

pub fn get<T: StoredThing>(conn: &Connection, id: ThingId) -> StorageResult<Option<T>> {
    let sql = format!(
        "SELECT {THING_COLUMNS}, {} FROM things t {} WHERE t.id = ?1",
        T::EXTRA_COLUMNS,
        T::JOIN
    );
    Ok(conn
        .query_row(&sql, params![id.to_string()], T::from_row)
        .optional()?)
}

/// Like [`get`], but a missing record is an error.
pub fn require<T: StoredThing>(conn: &Connection, id: ThingId) -> StorageResult<T> {
    get(conn, id)?.ok_or_else(|| StorageError::not_found(T::KIND.as_str(), id))
}

/// Just enough about a thing to place it in the ownership hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThingRef {
    pub id: ThingId,
    pub kind: ThingKind,
    pub dataset: DatasetId,
    /// Parent place, for submissions.
    pub place: Option<ThingId>,
}

pub fn thing_ref(conn: &Connection, id: ThingId) -> StorageResult<Option<ThingRef>> {
    Ok(conn
        .query_row(
            "SELECT t.kind, t.dataset_id, s.place_id FROM things t
             LEFT JOIN submissions s ON s.thing_id = t.id
             WHERE t.id = ?1",
            params![id.to_string()],
            |row| {
                Ok(ThingRef {
                    id,
                    kind: parsed_enum(row, 0)?,
                    dataset: parsed(row, 1)?,
                    place: parsed_opt(row, 2)?,
                })
            },
        )
        .optional()?)
}

/// Hard-deletes a thing and everything hanging off it.
pub fn delete(conn: &Connection, id: ThingId) -> StorageResult<bool> {
    let changed = conn.execute("DELETE FROM things WHERE id = ?1", params![id.to_string()])?;
    Ok(changed > 0)
}

/// Number of visible submissions per set under `place`, ordered by set name.
pub fn submission_counts(conn: &Connection, place: ThingId) -> StorageResult<Vec<(String, usize)>> {
    let mut stmt = conn.prepare(
        "SELECT s.set_name, COUNT(*) FROM submissions s JOIN things t ON t.id = s.thing_id
         WHERE s.place_id = ?1 AND t.visible = 1
         GROUP BY s.set_name ORDER BY s.set_name",
    )?;
    let rows = stmt.query_map(params![place.to_string()], |row| {
        let count: i64 = row.get(1)?;
        Ok((row.get::<_, String>(0)?, count as usize))
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Ids of every thing in a dataset, places and submissions alike.
pub fn ids_in_dataset(conn: &Connection, dataset: DatasetId) -> StorageResult<Vec<ThingId>> {
    let mut stmt = conn.prepare("SELECT id FROM things WHERE dataset_id = ?1 ORDER BY id")?;
    let rows = stmt.query_map(params![dataset.to_string()], |row| parsed(row, 0))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Loads the shared part of any thing, whatever its kind.
pub fn get_thing(conn: &Connection, id: ThingId) -> StorageResult<Option<Thing>> {
    Ok(conn
        .query_row(
            &format!("SELECT {THING_COLUMNS} FROM things t WHERE t.id = ?1"),
            params![id.to_string()],
            thing_from_row,
        )
        .optional()?)
}
