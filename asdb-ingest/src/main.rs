//! asdb-ingest - Anisong database import pipeline
//!
//! Modes:
//! - `import` (default): run the full pipeline — delta imports in dependency
//!   order, then rebuild the materialized table and the FTS index
//! - `materialize`: rebuild only the materialized table and the FTS index
//! - `demo`: read-only sample queries with timings plus database stats

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use asdb_common::config::IngestConfig;
use asdb_ingest::import::{run_full_import, DatasetBundle};
use asdb_ingest::report::LogReporter;
use asdb_ingest::{materialize, search, stats};

#[derive(Parser)]
#[command(name = "asdb-ingest", about = "Anisong database import pipeline")]
struct Cli {
    /// TOML config file (defaults apply when absent)
    #[arg(long, default_value = "asdb.toml")]
    config: PathBuf,

    /// Database file, overriding the config
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full import pipeline (default)
    Import,
    /// Rebuild the materialized table and FTS index only
    Materialize,
    /// Read-only performance demo and database statistics
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    let mut config = IngestConfig::load(&cli.config)?;
    if let Some(db) = cli.db {
        config.database_path = db;
    }

    info!("Starting asdb-ingest");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Database: {}", config.database_path.display());

    // Schema must exist (and be intact) before any mode proceeds
    let pool = asdb_common::db::init_database(&config.database_path).await?;

    match cli.command.unwrap_or(Command::Import) {
        Command::Import => {
            let bundle = DatasetBundle::load(&config);
            match run_full_import(&pool, &bundle, &LogReporter).await? {
                Some(summary) => {
                    info!(
                        "Pipeline finished: {} artists, {} groups, {} songs, {} anime processed",
                        summary.artists.entities.total,
                        summary.groups.entities.total,
                        summary.songs.entities.total,
                        summary.anime.entities.total,
                    );
                }
                None => info!("Nothing imported"),
            }
        }
        Command::Materialize => {
            let rows = materialize::rebuild_song_full_mat(&pool).await?;
            let indexed = search::rebuild_song_search(&pool).await?;
            info!("Materialized {} rows, indexed {}", rows, indexed);
        }
        Command::Demo => {
            stats::run_query_demo(&pool).await?;
            stats::analyze(&pool).await?;
            stats::check_integrity(&pool).await?;
            for (table, count) in stats::database_stats(&pool).await {
                info!("   {}: {} records", table, count);
            }
        }
    }

    Ok(())
}
