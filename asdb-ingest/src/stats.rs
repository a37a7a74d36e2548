//! Read-only diagnostics: row counts, timed sample queries, maintenance
//!
//! Nothing here is part of the import contract; this backs the `demo` mode
//! and issues no writes beyond VACUUM/ANALYZE maintenance when asked.

use asdb_common::Result;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{info, warn};

const PIPELINE_TABLES: &[&str] = &[
    "anime",
    "anime_names",
    "song",
    "song_links",
    "artist",
    "artist_alt_name",
    "groups",
    "group_alt_name",
    "group_artist",
    "group_group",
];

const CURATED_TABLES: &[&str] = &["song_urls", "anime_list", "anime_genre", "anime_tag"];

/// Per-table row counts plus media URL coverage
///
/// Tables that do not exist (or cannot be counted) report zero rather than
/// failing the whole overview.
pub async fn database_stats(pool: &SqlitePool) -> BTreeMap<String, i64> {
    let mut stats = BTreeMap::new();

    for table in PIPELINE_TABLES.iter().chain(CURATED_TABLES) {
        let count = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .unwrap_or(0);
        stats.insert((*table).to_string(), count);
    }

    for column in ["hq", "mq", "audio", "difficulty", "length"] {
        let count = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM song_urls WHERE {column} IS NOT NULL"
        ))
        .fetch_one(pool)
        .await
        .unwrap_or(0);
        stats.insert(format!("song_urls_with_{column}"), count);
    }

    stats
}

/// Issue the read-only sample queries and report wall-clock timings
pub async fn run_query_demo(pool: &SqlitePool) -> Result<()> {
    let anime_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM anime")
        .fetch_one(pool)
        .await?;
    if anime_count == 0 {
        warn!("Database is empty; import data before running the demo");
        return Ok(());
    }
    info!("Database holds {} anime records", anime_count);

    let mut total_ms = 0.0;

    total_ms += timed_count(
        pool,
        "name LIKE scan",
        "SELECT COUNT(*) FROM anime_names WHERE name LIKE '%Attack%'",
    )
    .await?;

    total_ms += timed_count(
        pool,
        "anime-song join",
        "SELECT COUNT(*) FROM anime a \
         JOIN song_links sl ON a.ann_id = sl.ann_id \
         JOIN song s ON sl.song_id = s.song_id \
         WHERE a.year >= 2020 AND s.category = 1",
    )
    .await?;

    total_ms += timed_count(
        pool,
        "category aggregate",
        "SELECT COUNT(*) FROM (SELECT category, COUNT(*) FROM song GROUP BY category)",
    )
    .await?;

    total_ms += timed_count(
        pool,
        "artist song counts",
        "SELECT COUNT(*) FROM (\
             SELECT a.name, COUNT(s.song_id) AS song_count \
             FROM artist a LEFT JOIN song s ON a.artist_id = s.song_artist_id \
             WHERE a.name LIKE '%Yoko%' \
             GROUP BY a.artist_id, a.name ORDER BY song_count DESC LIMIT 10)",
    )
    .await?;

    total_ms += timed_count(
        pool,
        "filtered multi-join",
        "SELECT COUNT(DISTINCT s.song_id) FROM song s \
         JOIN song_links sl ON s.song_id = sl.song_id \
         JOIN anime a ON sl.ann_id = a.ann_id \
         WHERE a.year >= 2020 AND sl.rebroadcast = 0 AND sl.uploaded = 1",
    )
    .await?;

    info!("Demo complete; total query time {:.4} ms", total_ms);
    Ok(())
}

async fn timed_count(pool: &SqlitePool, label: &str, sql: &str) -> Result<f64> {
    let start = Instant::now();
    let result: i64 = sqlx::query_scalar(sql).fetch_one(pool).await?;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    info!("{}: {} rows in {:.4} ms", label, result, elapsed_ms);
    Ok(elapsed_ms)
}

/// Reclaim free pages
pub async fn vacuum(pool: &SqlitePool) -> Result<()> {
    sqlx::query("VACUUM").execute(pool).await?;
    info!("Database vacuumed");
    Ok(())
}

/// Refresh planner statistics
pub async fn analyze(pool: &SqlitePool) -> Result<()> {
    sqlx::query("ANALYZE").execute(pool).await?;
    info!("Database statistics updated");
    Ok(())
}

/// Run PRAGMA integrity_check, returning true when the store reports "ok"
pub async fn check_integrity(pool: &SqlitePool) -> Result<bool> {
    let result: String = sqlx::query_scalar("PRAGMA integrity_check")
        .fetch_one(pool)
        .await?;
    if result == "ok" {
        info!("Database integrity OK");
        Ok(true)
    } else {
        warn!("Database integrity issues: {}", result);
        Ok(false)
    }
}
