use mapshare_types::{now, DatasetId, Timestamp, WebhookId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Events a webhook can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEvent {
    Add,
}

impl WebhookEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEvent::Add => "add",
        }
    }
}

/// A user-defined HTTP callback for things added to a submission set.
///
/// Only the configuration lives here; delivery is someone else's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    pub id: WebhookId,
    pub dataset: DatasetId,
    pub submission_set: String,
    pub event: WebhookEvent,
    pub url: String,
    pub created_datetime: Timestamp,
    pub updated_datetime: Timestamp,
}

impl Webhook {
    pub fn new(dataset: DatasetId, submission_set: impl Into<String>, url: impl Into<String>) -> Self {
        let at = now();
        Self {
            id: WebhookId::new(),
            dataset,
            submission_set: submission_set.into(),
            event: WebhookEvent::Add,
            url: url.into(),
            created_datetime: at,
            updated_datetime: at,
        }
    }
}

impl fmt::Display for Webhook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "On {} data in {}", self.event.as_str(), self.submission_set)
    }
}
