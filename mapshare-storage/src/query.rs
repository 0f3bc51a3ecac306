//! Composable queries over places and submissions.
//!
//! A [`ThingQuery`] is always anchored to one dataset. Plain filters map to
//! columns of `things` and the kind table; index filters are rewritten into
//! `EXISTS` subqueries over `indexed_values`, so no blob is ever scanned and
//! the other filters are left untouched.

use crate::things::{StoredThing, THING_COLUMNS};
use crate::{index_engine, StorageError, StorageResult};
use mapshare_model::{BoundingBox, ExtractedValue, IndexOp, IndexType, Place, Submission};
use mapshare_types::{DatasetId, ThingId, UserId};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde_json::Value;
use std::marker::PhantomData;

/// A `(field, operator, value)` predicate against an indexed field.
///
/// For [`IndexOp::In`] the value should be a JSON array; any other value is
/// treated as a one-element list.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexFilter {
    pub field: String,
    pub op: IndexOp,
    pub value: Value,
}

/// Builder for a filtered, newest-first listing of `T`.
#[derive(Debug, Clone)]
pub struct ThingQuery<T> {
    dataset: DatasetId,
    visible: Option<bool>,
    submitter: Option<UserId>,
    place: Option<ThingId>,
    set_name: Option<String>,
    bbox: Option<BoundingBox>,
    index_filters: Vec<IndexFilter>,
    limit: Option<usize>,
    offset: usize,
    _kind: PhantomData<fn() -> T>,
}

impl<T: StoredThing> ThingQuery<T> {
    pub fn new(dataset: DatasetId) -> Self {
        Self {
            dataset,
            visible: None,
            submitter: None,
            place: None,
            set_name: None,
            bbox: None,
            index_filters: Vec::new(),
            limit: None,
            offset: 0,
            _kind: PhantomData,
        }
    }

    /// Only things whose visibility flag equals `visible`.
    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    pub fn submitted_by(mut self, submitter: UserId) -> Self {
        self.submitter = Some(submitter);
        self
    }

    /// Adds an index predicate. Checked against the dataset's specs when the
    /// query runs.
    pub fn filter_by_index(mut self, field: impl Into<String>, op: IndexOp, value: impl Into<Value>) -> Self {
        self.index_filters.push(IndexFilter {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Runs the query.
    pub fn fetch(&self, conn: &Connection) -> StorageResult<Vec<T>> {
        let (where_sql, mut args) = self.where_clause(conn)?;
        let mut sql = format!(
            "SELECT {THING_COLUMNS}, {} FROM things t {} WHERE {where_sql}
             ORDER BY t.updated_datetime DESC, t.id DESC",
            T::EXTRA_COLUMNS,
            T::JOIN
        );
        if self.limit.is_some() || self.offset > 0 {
            sql.push_str(" LIMIT ? OFFSET ?");
            args.push(SqlValue::Integer(self.limit.map_or(-1, |l| l as i64)));
            args.push(SqlValue::Integer(self.offset as i64));
        }
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args), T::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Number of matching things, ignoring limit and offset.
    pub fn count(&self, conn: &Connection) -> StorageResult<usize> {
        let (where_sql, args) = self.where_clause(conn)?;
        let sql = format!("SELECT COUNT(*) FROM things t {} WHERE {where_sql}", T::JOIN);
        let count: i64 = conn.query_row(&sql, params_from_iter(args), |row| row.get(0))?;
        Ok(count as usize)
    }

    fn where_clause(&self, conn: &Connection) -> StorageResult<(String, Vec<SqlValue>)> {
        let mut clauses = vec!["t.kind = ?".to_string(), "t.dataset_id = ?".to_string()];
        let mut args = vec![
            SqlValue::Text(T::KIND.as_str().to_string()),
            SqlValue::Text(self.dataset.to_string()),
        ];

        if let Some(visible) = self.visible {
            clauses.push("t.visible = ?".into());
            args.push(SqlValue::Integer(i64::from(visible)));
        }
        if let Some(submitter) = self.submitter {
            clauses.push("t.submitter_id = ?".into());
            args.push(SqlValue::Text(submitter.to_string()));
        }
        if let Some(place) = self.place {
            clauses.push("k.place_id = ?".into());
            args.push(SqlValue::Text(place.to_string()));
        }
        if let Some(set_name) = &self.set_name {
            clauses.push("k.set_name = ?".into());
            args.push(SqlValue::Text(set_name.clone()));
        }
        if let Some(b) = self.bbox {
            clauses.push("k.max_x >= ? AND k.min_x <= ? AND k.max_y >= ? AND k.min_y <= ?".into());
            args.extend([b.min_x, b.max_x, b.min_y, b.max_y].map(SqlValue::Real));
        }
        for filter in &self.index_filters {
            let (clause, mut filter_args) = self.index_clause(conn, filter)?;
            clauses.push(clause);
            args.append(&mut filter_args);
        }
        Ok((clauses.join(" AND "), args))
    }

    /// Rewrites one index predicate into a subquery, dispatching on the
    /// spec's declared type.
    fn index_clause(
        &self,
        conn: &Connection,
        filter: &IndexFilter,
    ) -> StorageResult<(String, Vec<SqlValue>)> {
        let spec = index_engine::spec_by_name(conn, self.dataset, &filter.field)?
            .ok_or_else(|| StorageError::UnknownIndex(filter.field.clone()))?;
        if !spec.attr_type.supports(filter.op) {
            return Err(StorageError::UnsupportedOperator {
                field: filter.field.clone(),
                op: filter.op,
                index_type: spec.attr_type,
            });
        }

        let column = match spec.attr_type {
            IndexType::Numeric => "iv.num_value",
            IndexType::String | IndexType::Lookup => "iv.text_value",
        };
        let subquery = "SELECT 1 FROM indexed_values iv WHERE iv.thing_id = t.id AND iv.index_id = ?";
        let mut args = vec![SqlValue::Text(spec.id.to_string())];

        let candidates: Vec<&Value> = match (&filter.value, filter.op) {
            (Value::Array(items), IndexOp::In) => items.iter().collect(),
            (value, _) => vec![value],
        };
        let values: Vec<SqlValue> = candidates
            .into_iter()
            .filter_map(|v| spec.attr_type.coerce(v))
            .map(sql_value)
            .collect();

        // A value that cannot be read as the index type matches nothing,
        // so `ne` against it matches everything.
        let Some(first) = values.first().cloned() else {
            let constant = if filter.op == IndexOp::Ne { "1" } else { "0" };
            return Ok((constant.to_string(), Vec::new()));
        };

        let clause = match filter.op {
            IndexOp::Eq => format!("EXISTS ({subquery} AND {column} = ?)"),
            IndexOp::Ne => format!("NOT EXISTS ({subquery} AND {column} = ?)"),
            IndexOp::Lt => format!("EXISTS ({subquery} AND {column} < ?)"),
            IndexOp::Lte => format!("EXISTS ({subquery} AND {column} <= ?)"),
            IndexOp::Gt => format!("EXISTS ({subquery} AND {column} > ?)"),
            IndexOp::Gte => format!("EXISTS ({subquery} AND {column} >= ?)"),
            IndexOp::Contains => format!("EXISTS ({subquery} AND instr({column}, ?) > 0)"),
            IndexOp::In => {
                let marks = vec!["?"; values.len()].join(", ");
                args.extend(values);
                return Ok((format!("EXISTS ({subquery} AND {column} IN ({marks}))"), args));
            }
        };
        args.push(first);
        Ok((clause, args))
    }
}

fn sql_value(value: ExtractedValue) -> SqlValue {
    match value {
        ExtractedValue::Numeric(n) => SqlValue::Real(n),
        ExtractedValue::Text(s) | ExtractedValue::Lookup(s) => SqlValue::Text(s),
    }
}

impl ThingQuery<Place> {
    /// Places whose geometry's bounding box intersects `bbox`.
    pub fn within(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }
}

impl ThingQuery<Submission> {
    pub fn on_place(mut self, place: ThingId) -> Self {
        self.place = Some(place);
        self
    }

    pub fn in_set(mut self, set_name: impl Into<String>) -> Self {
        self.set_name = Some(set_name.into());
        self
    }
}
