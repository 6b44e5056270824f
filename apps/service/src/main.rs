use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use logger::init_tracing;
use tracing::info;

mod config;
mod database;
mod monitoring;
mod orchestrator;
mod pool;

use config::Config;
use orchestrator::Orchestrator;

/// Periodic health checks for endpoints reporting multiple entries in one
/// JSON response
#[derive(Parser)]
#[command(name = "entrywatch-service", version, about)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the database path from the configuration
    #[arg(long)]
    database: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    show_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();

    let mut config = Config::from_config(args.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(database) = args.database {
        config.database.path = database;
    }

    if args.show_config {
        println!("{config}");
        return Ok(());
    }

    info!("Opening database at {}", config.database.path.display());
    let db = libsql::Builder::new_local(&config.database.path).build().await?;
    let manager = pool::LibsqlManager::new(db);
    let pool = deadpool::managed::Pool::builder(manager).build()?;

    Orchestrator::start(config, pool).await
}
