use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use ironlog::catalog::Catalog;
use ironlog::cli::{Cli, Commands};
use ironlog::commands;
use ironlog::history::{HistoryStore, StreakPolicy};
use ironlog::storage::{JsonFileStore, default_data_dir};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let data_dir = default_data_dir().context("failed to locate a data directory")?;
    let catalog_path = data_dir.join("catalog.toml");
    let catalog = Arc::new(Catalog::load_file(&catalog_path)?);
    let store = Arc::new(JsonFileStore::open(data_dir)?);
    let history = Arc::new(HistoryStore::load(store, StreakPolicy::default()));

    match cli.cmd {
        Commands::Workout(cmd) => commands::workout::handle(cmd, &catalog, &catalog_path)?,
        Commands::Session(cmd) => {
            commands::session::handle(cmd, catalog, history, &catalog_path).await?
        }
        Commands::Stats => commands::stats::handle(&history)?,
    }

    Ok(())
}
