use crate::Geometry;
use mapshare_types::{now, DatasetId, ThingId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Which concrete record a thing row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThingKind {
    Place,
    Submission,
}

impl ThingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThingKind::Place => "place",
            ThingKind::Submission => "submission",
        }
    }
}

impl fmt::Display for ThingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "place" => Ok(ThingKind::Place),
            "submission" => Ok(ThingKind::Submission),
            other => Err(format!("unknown thing kind: {other}")),
        }
    }
}

/// Fields shared by everything an end user submits.
///
/// `data` is the raw JSON blob exactly as submitted. It is only parsed when
/// index values are derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thing {
    pub id: Option<ThingId>,
    pub dataset: DatasetId,
    pub submitter: Option<UserId>,
    pub data: String,
    pub visible: bool,
    pub created_datetime: Timestamp,
    pub updated_datetime: Timestamp,
}

impl Thing {
    /// An unsaved, visible thing with an empty object blob.
    pub fn new(dataset: DatasetId) -> Self {
        let at = now();
        Self {
            id: None,
            dataset,
            submitter: None,
            data: "{}".to_string(),
            visible: true,
            created_datetime: at,
            updated_datetime: at,
        }
    }

    pub fn with_submitter(mut self, submitter: UserId) -> Self {
        self.submitter = Some(submitter);
        self
    }

    pub fn with_data(mut self, data: &serde_json::Value) -> Self {
        self.set_data(data);
        self
    }

    /// Replaces the blob with the serialized form of `data`.
    pub fn set_data(&mut self, data: &serde_json::Value) {
        self.data = data.to_string();
    }

    /// Parses the blob. A malformed blob reads as `null`, so every index
    /// path extracted from it misses.
    pub fn parsed_data(&self) -> serde_json::Value {
        serde_json::from_str(&self.data).unwrap_or(serde_json::Value::Null)
    }

    /// True until the record store has assigned an id.
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }
}

impl Default for Thing {
    fn default() -> Self {
        Self::new(DatasetId::from_uuid(Uuid::nil()))
    }
}

/// A thing with a location. The root of a submission tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub thing: Thing,
    pub geometry: Geometry,
}

impl Place {
    pub fn new(dataset: DatasetId, geometry: Geometry) -> Self {
        Self {
            thing: Thing::new(dataset),
            geometry,
        }
    }

    pub fn with_data(mut self, data: &serde_json::Value) -> Self {
        self.thing.set_data(data);
        self
    }
}

impl Default for Place {
    fn default() -> Self {
        Self {
            thing: Thing::default(),
            geometry: Geometry::Point([0.0, 0.0]),
        }
    }
}

/// A comment, vote, survey answer or similar, attached to one place and
/// grouped with its siblings by `set_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub thing: Thing,
    pub place: ThingId,
    pub set_name: String,
}

impl Submission {
    pub fn new(dataset: DatasetId, place: ThingId, set_name: impl Into<String>) -> Self {
        Self {
            thing: Thing::new(dataset),
            place,
            set_name: set_name.into(),
        }
    }

    pub fn with_data(mut self, data: &serde_json::Value) -> Self {
        self.thing.set_data(data);
        self
    }
}

impl Default for Submission {
    fn default() -> Self {
        Self {
            thing: Thing::default(),
            place: ThingId::from_uuid(Uuid::nil()),
            set_name: String::new(),
        }
    }
}

/// Access to the shared [`Thing`] part of a concrete record.
pub trait SubmittedThing {
    const KIND: ThingKind;

    fn thing(&self) -> &Thing;

    fn thing_mut(&mut self) -> &mut Thing;

    fn id(&self) -> Option<ThingId> {
        self.thing().id
    }
}

impl SubmittedThing for Place {
    const KIND: ThingKind = ThingKind::Place;

    fn thing(&self) -> &Thing {
        &self.thing
    }

    fn thing_mut(&mut self) -> &mut Thing {
        &mut self.thing
    }
}

impl SubmittedThing for Submission {
    const KIND: ThingKind = ThingKind::Submission;

    fn thing(&self) -> &Thing {
        &self.thing
    }

    fn thing_mut(&mut self) -> &mut Thing {
        &mut self.thing
    }
}
