//! Database access layer
//!
//! Pool initialization plus the idempotent schema manager. The pipeline is a
//! single-writer batch process, so the pool is sized at one connection; the
//! store's own locking is the only concurrency protection required.

pub mod schema;

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (or create) the database and ensure the schema exists
///
/// Safe to call on every run, including against a pre-populated store. A
/// failure anywhere in schema creation is fatal and propagates to the caller.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    configure_connection(&pool).await?;
    schema::initialize_schema(&pool).await?;

    Ok(pool)
}

/// Open an in-memory database with the full schema
///
/// Used by tests across the workspace. A single connection keeps every
/// statement on the same in-memory store.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    configure_connection(&pool).await?;
    schema::initialize_schema(&pool).await?;

    Ok(pool)
}

async fn configure_connection(pool: &SqlitePool) -> Result<()> {
    // Foreign keys stay declarative (unenforced). Datasets routinely carry
    // relation ids whose partner record is absent or was rejected; only song
    // links get referential validation, at import time.
    sqlx::query("PRAGMA foreign_keys = OFF").execute(pool).await?;

    // WAL keeps readers unblocked while the import batches write
    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;

    // NORMAL is durable enough under WAL and much faster for bulk writes
    sqlx::query("PRAGMA synchronous = NORMAL").execute(pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;

    Ok(())
}
