//! Dataset access collaborators: allowed browser origins and API keys.
//!
//! Policy (who may do what) is decided elsewhere. These types only carry the
//! permission flags and answer "does this origin header / key belong here".

use crate::{ModelError, ModelResult};
use mapshare_types::{ApiKeyId, DatasetId, OriginId};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Per-submission-set permission flags. `submission_set == "*"` applies to
/// every set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPermission {
    pub submission_set: String,
    pub can_retrieve: bool,
    pub can_create: bool,
    pub can_update: bool,
    pub can_destroy: bool,
}

impl Default for DataPermission {
    fn default() -> Self {
        Self {
            submission_set: "*".to_string(),
            can_retrieve: true,
            can_create: true,
            can_update: true,
            can_destroy: true,
        }
    }
}

/// A browser origin allowed to talk to a dataset, as a regex over the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Origin {
    pub id: OriginId,
    pub dataset: DatasetId,
    pub pattern: String,
    pub permissions: DataPermission,
}

impl Origin {
    /// Builds an origin with full default permissions after checking that
    /// `pattern` compiles.
    pub fn new(dataset: DatasetId, pattern: impl Into<String>) -> ModelResult<Self> {
        let pattern = pattern.into();
        compile(&pattern)?;
        Ok(Self {
            id: OriginId::new(),
            dataset,
            pattern,
            permissions: DataPermission::default(),
        })
    }

    /// Whether `origin_header` (e.g. `https://www.openplans.org`) is matched
    /// by `pattern`. The scheme and a trailing slash are ignored and the
    /// pattern must match the whole host. `*` matches anything.
    pub fn matches(pattern: &str, origin_header: &str) -> bool {
        if pattern == "*" {
            return true;
        }
        let host = origin_header
            .split_once("://")
            .map_or(origin_header, |(_, rest)| rest)
            .trim_end_matches('/');
        compile(pattern).is_ok_and(|re| re.is_match(host))
    }
}

fn compile(pattern: &str) -> ModelResult<Regex> {
    let source = if pattern == "*" {
        ".*".to_string()
    } else {
        format!("^(?:{pattern})$")
    };
    Regex::new(&source).map_err(|e| ModelError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// A secret key granting API access to one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: ApiKeyId,
    pub dataset: DatasetId,
    pub key: String,
    pub permissions: DataPermission,
}

impl ApiKey {
    pub fn new(dataset: DatasetId, key: impl Into<String>) -> Self {
        Self {
            id: ApiKeyId::new(),
            dataset,
            key: key.into(),
            permissions: DataPermission::default(),
        }
    }
}
