//! Full-text search index
//!
//! `song_search` is a standalone FTS5 table (no `content=` option), so its
//! shadow tables hold their own copy of the indexed text. That makes the
//! index structurally diff-able against a remote replica instead of being a
//! thin alias over song_full_mat. Row identity equals the song-link id,
//! enabling point lookups by rowid.
//!
//! Rebuild is total: drop, recreate, bulk-copy from song_full_mat. It must
//! run after materialization; there is no incremental update path.

use asdb_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::info;

/// Rebuild the song_search FTS5 index from song_full_mat
///
/// Returns the number of indexed rows. Fails if song_full_mat has not been
/// materialized yet.
pub async fn rebuild_song_search(pool: &SqlitePool) -> Result<u64> {
    let mat_exists: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'song_full_mat'",
    )
    .fetch_one(pool)
    .await?;
    if mat_exists == 0 {
        return Err(Error::InvalidInput(
            "song_full_mat does not exist; run materialization first".to_string(),
        ));
    }

    info!("Building FTS5 index song_search (standalone mode)");

    let mut tx = pool.begin().await?;

    sqlx::query("DROP TABLE IF EXISTS song_search")
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        CREATE VIRTUAL TABLE song_search USING fts5(
            song_name,
            song_artist,
            song_composer,
            song_arranger,
            anime_name_ja,
            anime_name_en,
            anime_alt_names
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO song_search(rowid, song_name, song_artist, song_composer, song_arranger,
                                anime_name_ja, anime_name_en, anime_alt_names)
        SELECT ann_song_id, song_name, song_artist, song_composer, song_arranger,
               anime_name_ja, anime_name_en, anime_alt_names
        FROM song_full_mat
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM song_search")
        .fetch_one(pool)
        .await?;
    info!("song_search built with {} indexed rows", count);

    Ok(count as u64)
}
