//! Runtime configuration, read from `mapshare.toml`.

use crate::{CoreError, CoreResult};
use mapshare_model::DataPermission;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Origins every new dataset is allowed to be edited from.
pub const DEFAULT_ORIGIN_PATTERNS: [&str; 2] = ["(?:www.)?openplans.org", "openplans.github.io"];

/// Permissions granted to seeded origins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginPermissions {
    #[serde(default = "yes")]
    pub can_retrieve: bool,
    #[serde(default = "yes")]
    pub can_create: bool,
    #[serde(default)]
    pub can_update: bool,
    #[serde(default)]
    pub can_destroy: bool,
}

fn yes() -> bool {
    true
}

impl Default for OriginPermissions {
    fn default() -> Self {
        Self {
            can_retrieve: true,
            can_create: true,
            can_update: false,
            can_destroy: false,
        }
    }
}

impl OriginPermissions {
    /// The permission row for all submission sets.
    pub fn to_permission(&self) -> DataPermission {
        DataPermission {
            submission_set: "*".to_string(),
            can_retrieve: self.can_retrieve,
            can_create: self.can_create,
            can_update: self.can_update,
            can_destroy: self.can_destroy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapshareConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_attachment_root")]
    pub attachment_root: PathBuf,
    #[serde(default = "default_origins")]
    pub default_origins: Vec<String>,
    #[serde(default)]
    pub default_origin_permissions: OriginPermissions,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("mapshare.db")
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_attachment_root() -> PathBuf {
    PathBuf::from("media")
}

fn default_origins() -> Vec<String> {
    DEFAULT_ORIGIN_PATTERNS.iter().map(|p| p.to_string()).collect()
}

impl Default for MapshareConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            cache_ttl_secs: default_cache_ttl_secs(),
            attachment_root: default_attachment_root(),
            default_origins: default_origins(),
            default_origin_permissions: OriginPermissions::default(),
        }
    }
}

impl MapshareConfig {
    pub fn from_toml_str(contents: &str) -> CoreResult<Self> {
        toml::from_str(contents).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Loads the config at `path`. A missing file yields the defaults; a file
    /// that exists but does not parse is an error.
    pub fn load_from(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            info!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("failed to read {}: {e}", path.display())))?;
        let config = Self::from_toml_str(&contents)?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn to_toml_string(&self) -> CoreResult<String> {
        toml::to_string_pretty(self).map_err(|e| CoreError::Config(e.to_string()))
    }
}
