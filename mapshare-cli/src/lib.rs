//! Commands behind the `mapshare` admin binary.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mapshare_core::{DataLayer, MapshareConfig};
use mapshare_model::{Attachment, Dataset, IndexType, Place};
use mapshare_storage::things;
use mapshare_types::ThingId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mapshare")]
#[command(about = "Administer a mapshare database")]
pub struct Args {
    /// Path to the config file
    #[arg(short, long, default_value = "mapshare.toml")]
    pub config: PathBuf,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Create the database and attachment directory
    Init {
        /// Also write the effective config to the config path
        #[arg(long)]
        write_config: bool,
    },
    /// Create a dataset, and its owner if they do not exist yet
    CreateDataset {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        slug: String,
        /// Display name (defaults to the slug)
        #[arg(long)]
        name: Option<String>,
    },
    /// Declare an indexed field and index existing things
    AddIndex {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        dataset: String,
        #[arg(long)]
        field: String,
        #[arg(long, value_enum)]
        kind: IndexKind,
    },
    /// Re-derive every indexed value in a dataset
    Reindex {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        dataset: String,
    },
    /// Print a place with its submission counts and attachments
    ShowPlace { id: ThingId },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum IndexKind {
    Numeric,
    String,
    Lookup,
}

impl From<IndexKind> for IndexType {
    fn from(kind: IndexKind) -> Self {
        match kind {
            IndexKind::Numeric => IndexType::Numeric,
            IndexKind::String => IndexType::String,
            IndexKind::Lookup => IndexType::Lookup,
        }
    }
}

/// What `show-place` prints.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PlaceReport {
    pub place: Place,
    pub data: serde_json::Value,
    pub submission_counts: BTreeMap<String, usize>,
    pub attachments: Vec<Attachment>,
    pub actions: usize,
}

/// Runs `command` and returns what should be printed.
pub fn run(
    command: &Command,
    layer: &DataLayer,
    config: &MapshareConfig,
    config_path: &Path,
) -> Result<String> {
    match command {
        Command::Init { write_config } => {
            if *write_config {
                let text = config.to_toml_string()?;
                std::fs::write(config_path, text)
                    .with_context(|| format!("Failed to write config to {:?}", config_path))?;
                info!("Wrote config to {:?}", config_path);
            }
            Ok(format!(
                "Database:    {}\nAttachments: {}",
                config.database_path.display(),
                config.attachment_root.display()
            ))
        }
        Command::CreateDataset { owner, slug, name } => {
            let user = match layer.user_by_name(owner)? {
                Some(user) => user,
                None => layer.create_user(owner)?,
            };
            let display_name = name.as_deref().unwrap_or(slug);
            let dataset = layer
                .create_dataset(user.id, display_name, slug)
                .with_context(|| format!("Failed to create dataset {owner}/{slug}"))?;
            let id = dataset.id.ok_or_else(|| anyhow!("dataset was not assigned an id"))?;
            Ok(format!("Created dataset {owner}/{slug} ({id})"))
        }
        Command::AddIndex {
            owner,
            dataset,
            field,
            kind,
        } => {
            let id = dataset_id(layer, owner, dataset)?;
            let spec = layer.add_index_spec(id, field, (*kind).into())?;
            Ok(format!(
                "Indexed {owner}/{dataset} field {:?} as {}",
                spec.attr_name, spec.attr_type
            ))
        }
        Command::Reindex { owner, dataset } => {
            let id = dataset_id(layer, owner, dataset)?;
            let visited = layer.reindex_dataset(id)?;
            Ok(format!("Reindexed {visited} things in {owner}/{dataset}"))
        }
        Command::ShowPlace { id } => {
            let report = place_report(layer, *id)?;
            Ok(serde_json::to_string_pretty(&report)?)
        }
    }
}

fn dataset_id(layer: &DataLayer, owner: &str, slug: &str) -> Result<mapshare_types::DatasetId> {
    let user = layer
        .user_by_name(owner)?
        .ok_or_else(|| anyhow!("No user named {owner:?}"))?;
    let dataset: Dataset = layer
        .dataset_by_slug(user.id, slug)?
        .ok_or_else(|| anyhow!("No dataset {owner}/{slug}"))?;
    dataset.id.ok_or_else(|| anyhow!("dataset {owner}/{slug} has no id"))
}

/// Builds the `show-place` report through the place's read-through cache.
pub fn place_report(layer: &DataLayer, id: ThingId) -> Result<PlaceReport> {
    let place = layer.place(id).with_context(|| format!("Failed to load place {id}"))?;
    let report = layer.cached_place(&place, "report", || {
        let counts = layer.store().read(|c| things::submission_counts(c, id))?;
        Ok(PlaceReport {
            data: place.thing.parsed_data(),
            submission_counts: counts.into_iter().collect(),
            attachments: layer.attachments_for(id)?,
            actions: layer.actions_for(id)?.len(),
            place: place.clone(),
        })
    })?;
    Ok(report)
}
