use crate::{ModelError, ModelResult};
use mapshare_types::{DatasetId, UserId};
use serde::{Deserialize, Serialize};

const MAX_SLUG_LEN: usize = 128;

/// An account that owns datasets and submits things.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
        }
    }
}

/// A named collection of places and submissions, owned by a user and meant
/// for one coherent purpose (usually a single map).
///
/// `(owner, slug)` is unique across the store. `id` stays `None` until the
/// dataset is first persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: Option<DatasetId>,
    pub owner: UserId,
    pub display_name: String,
    pub slug: String,
}

impl Dataset {
    /// Builds an unsaved dataset, rejecting malformed slugs.
    pub fn new(
        owner: UserId,
        display_name: impl Into<String>,
        slug: impl Into<String>,
    ) -> ModelResult<Self> {
        let slug = slug.into();
        validate_slug(&slug)?;
        Ok(Self {
            id: None,
            owner,
            display_name: display_name.into(),
            slug,
        })
    }
}

/// Slugs are 1..=128 characters of ASCII letters, digits, `-` and `_`.
pub fn validate_slug(slug: &str) -> ModelResult<()> {
    let well_formed = !slug.is_empty()
        && slug.len() <= MAX_SLUG_LEN
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if well_formed {
        Ok(())
    } else {
        Err(ModelError::InvalidSlug(slug.to_string()))
    }
}
