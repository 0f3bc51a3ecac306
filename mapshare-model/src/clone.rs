//! Duplicating entities with selective overrides.
//!
//! Each cloneable type declares a [`FieldSchema`]: its own fields, which of
//! them is its identity, and (when that identity is a link to a base record)
//! the schema of the base. Place and Submission are both composed over the
//! Thing schema, so cloning either one copies the Thing fields too while
//! skipping both the Thing id and the link to it.

use crate::{Geometry, ModelError, ModelResult, Place, Submission, Thing};
use mapshare_types::{DatasetId, ThingId, Timestamp, UserId};
use std::collections::BTreeSet;

/// Explicit field list for one entity type.
#[derive(Debug)]
pub struct FieldSchema {
    pub type_name: &'static str,
    /// Name of the primary identity field. `None` only for malformed schemas.
    pub identity: Option<&'static str>,
    /// Base record the identity links to, if any.
    pub parent: Option<&'static FieldSchema>,
    /// Fields declared by this type, identity included.
    pub fields: &'static [&'static str],
}

pub static THING_SCHEMA: FieldSchema = FieldSchema {
    type_name: "Thing",
    identity: Some("id"),
    parent: None,
    fields: &[
        "id",
        "dataset",
        "submitter",
        "data",
        "visible",
        "created_datetime",
        "updated_datetime",
    ],
};

pub static PLACE_SCHEMA: FieldSchema = FieldSchema {
    type_name: "Place",
    identity: Some("thing_ptr"),
    parent: Some(&THING_SCHEMA),
    fields: &["thing_ptr", "geometry"],
};

pub static SUBMISSION_SCHEMA: FieldSchema = FieldSchema {
    type_name: "Submission",
    identity: Some("thing_ptr"),
    parent: Some(&THING_SCHEMA),
    fields: &["thing_ptr", "place", "set_name"],
};

impl FieldSchema {
    /// Identity fields of this type and of every base it links to.
    pub fn ignore_fields(&self) -> ModelResult<BTreeSet<&'static str>> {
        let identity = self
            .identity
            .ok_or(ModelError::Structural(self.type_name))?;
        let mut ignore = BTreeSet::from([identity]);
        if let Some(parent) = self.parent {
            ignore.extend(parent.ignore_fields()?);
        }
        Ok(ignore)
    }

    /// Every field across the chain, base fields first.
    pub fn all_fields(&self) -> Vec<&'static str> {
        let mut fields = self.parent.map(FieldSchema::all_fields).unwrap_or_default();
        fields.extend(self.fields.iter().copied());
        fields
    }

    /// Fields a clone copies from its source.
    pub fn copyable_fields(&self) -> ModelResult<Vec<&'static str>> {
        let ignore = self.ignore_fields()?;
        Ok(self
            .all_fields()
            .into_iter()
            .filter(|f| !ignore.contains(f))
            .collect())
    }
}

/// A value for one named, non-identity field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Dataset(DatasetId),
    Submitter(Option<UserId>),
    Data(String),
    Visible(bool),
    CreatedDatetime(Timestamp),
    UpdatedDatetime(Timestamp),
    Geometry(Geometry),
    Place(ThingId),
    SetName(String),
}

impl FieldValue {
    pub fn field_name(&self) -> &'static str {
        match self {
            FieldValue::Dataset(_) => "dataset",
            FieldValue::Submitter(_) => "submitter",
            FieldValue::Data(_) => "data",
            FieldValue::Visible(_) => "visible",
            FieldValue::CreatedDatetime(_) => "created_datetime",
            FieldValue::UpdatedDatetime(_) => "updated_datetime",
            FieldValue::Geometry(_) => "geometry",
            FieldValue::Place(_) => "place",
            FieldValue::SetName(_) => "set_name",
        }
    }
}

/// Types that can be duplicated field by field.
pub trait Cloneable: Default {
    fn schema() -> &'static FieldSchema;

    fn get_field(&self, name: &str) -> Option<FieldValue>;

    /// Returns false when the type has no settable field of that name.
    fn set_field(&mut self, value: FieldValue) -> bool;
}

/// Builds a new, unsaved `T` with every non-identity field copied from
/// `source`, then `overrides` applied on top. The source is not modified.
pub fn clone_entity<T: Cloneable>(source: &T, overrides: Vec<FieldValue>) -> ModelResult<T> {
    let schema = T::schema();
    let ignore = schema.ignore_fields()?;
    let mut copy = T::default();

    for name in schema.copyable_fields()? {
        if let Some(value) = source.get_field(name) {
            copy.set_field(value);
        }
    }
    for value in overrides {
        let field = value.field_name();
        if ignore.contains(field) || !copy.set_field(value) {
            return Err(ModelError::UnknownField {
                type_name: schema.type_name,
                field,
            });
        }
    }
    Ok(copy)
}

fn get_thing_field(thing: &Thing, name: &str) -> Option<FieldValue> {
    match name {
        "dataset" => Some(FieldValue::Dataset(thing.dataset)),
        "submitter" => Some(FieldValue::Submitter(thing.submitter)),
        "data" => Some(FieldValue::Data(thing.data.clone())),
        "visible" => Some(FieldValue::Visible(thing.visible)),
        "created_datetime" => Some(FieldValue::CreatedDatetime(thing.created_datetime)),
        "updated_datetime" => Some(FieldValue::UpdatedDatetime(thing.updated_datetime)),
        _ => None,
    }
}

fn set_thing_field(thing: &mut Thing, value: FieldValue) -> Result<(), FieldValue> {
    match value {
        FieldValue::Dataset(v) => thing.dataset = v,
        FieldValue::Submitter(v) => thing.submitter = v,
        FieldValue::Data(v) => thing.data = v,
        FieldValue::Visible(v) => thing.visible = v,
        FieldValue::CreatedDatetime(v) => thing.created_datetime = v,
        FieldValue::UpdatedDatetime(v) => thing.updated_datetime = v,
        other => return Err(other),
    }
    Ok(())
}

impl Cloneable for Place {
    fn schema() -> &'static FieldSchema {
        &PLACE_SCHEMA
    }

    fn get_field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "geometry" => Some(FieldValue::Geometry(self.geometry.clone())),
            _ => get_thing_field(&self.thing, name),
        }
    }

    fn set_field(&mut self, value: FieldValue) -> bool {
        match set_thing_field(&mut self.thing, value) {
            Ok(()) => true,
            Err(FieldValue::Geometry(g)) => {
                self.geometry = g;
                true
            }
            Err(_) => false,
        }
    }
}

impl Cloneable for Submission {
    fn schema() -> &'static FieldSchema {
        &SUBMISSION_SCHEMA
    }

    fn get_field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "place" => Some(FieldValue::Place(self.place)),
            "set_name" => Some(FieldValue::SetName(self.set_name.clone())),
            _ => get_thing_field(&self.thing, name),
        }
    }

    fn set_field(&mut self, value: FieldValue) -> bool {
        match set_thing_field(&mut self.thing, value) {
            Ok(()) => true,
            Err(FieldValue::Place(p)) => {
                self.place = p;
                true
            }
            Err(FieldValue::SetName(s)) => {
                self.set_name = s;
                true
            }
            Err(_) => false,
        }
    }
}
