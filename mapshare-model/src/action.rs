use mapshare_types::{now, ActionId, ThingId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What happened to a thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Create,
    Update,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Create => "create",
            ActionKind::Update => "update",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(ActionKind::Create),
            "update" => Ok(ActionKind::Update),
            other => Err(format!("unknown action kind: {other}")),
        }
    }
}

/// Audit record of a create or update on a thing: what happened, when, and
/// which client reported it. Written once and never modified.
///
/// The submitter is not stored; it is whatever the referenced thing says.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub thing: ThingId,
    pub kind: ActionKind,
    pub source: Option<String>,
    pub created_datetime: Timestamp,
}

impl Action {
    pub fn new(thing: ThingId, kind: ActionKind, source: Option<String>) -> Self {
        Self {
            id: ActionId::new(),
            thing,
            kind,
            source,
            created_datetime: now(),
        }
    }
}
