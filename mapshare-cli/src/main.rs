//! mapshare admin binary.
//!
//! Usage:
//!   mapshare --config mapshare.toml init --write-config
//!   mapshare create-dataset --owner alice --slug parks --name "City parks"
//!   mapshare add-index --owner alice --dataset parks --field name --kind string
//!   mapshare show-place <place-id>

use anyhow::{Context, Result};
use clap::Parser;
use mapshare_cli::{run, Args};
use mapshare_core::{DataLayer, MapshareConfig};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let config = MapshareConfig::load_from(&args.config).context("Failed to load config")?;
    let layer = DataLayer::from_config(&config).context("Failed to open data layer")?;
    info!("Using database {:?}", config.database_path);

    let output = run(&args.command, &layer, &config, &args.config)?;
    println!("{output}");
    Ok(())
}
