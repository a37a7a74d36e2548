//! Materialized song table
//!
//! `song_full_mat` is the denormalized, search-optimized projection: one row
//! per song link (track occurrence), joining the normalized tables with the
//! curated extension tables and pre-aggregating the multi-valued fields.
//! It is rebuilt wholesale inside one transaction; on failure the previous
//! table remains untouched.

use asdb_common::Result;
use sqlx::SqlitePool;
use tracing::info;

/// The join that defines the materialized row
///
/// Curated cross-reference ids are required (inner join): a track whose
/// anime has no anime_list row is excluded. Media URLs are optional (left
/// join). Alternate names, genres and tags arrive pipe-joined from the
/// grouped CTEs.
const MAT_SELECT: &str = r#"
CREATE TABLE song_full_mat AS
WITH
anime_alt AS (
    SELECT ann_id, GROUP_CONCAT(name, '|') AS alt_names
    FROM anime_names
    WHERE is_main = 0
    GROUP BY ann_id
),
anime_genres_cte AS (
    SELECT ann_id, GROUP_CONCAT(genre_name, '|') AS genres
    FROM anime_genre
    GROUP BY ann_id
),
anime_tags_cte AS (
    SELECT ann_id, GROUP_CONCAT(tag_name, '|') AS tags
    FROM anime_tag
    GROUP BY ann_id
)
SELECT
    sl.ann_song_id,
    sl.song_id,
    sl.ann_id,
    al.mal_id, al.anilist_id, al.kitsu_id,

    a.year AS anime_year,
    a.season_id AS anime_season_id,
    CASE a.season_id
        WHEN 0 THEN 'Winter' WHEN 1 THEN 'Spring'
        WHEN 2 THEN 'Summer' WHEN 3 THEN 'Fall'
    END AS anime_season_text,

    an_ja.name AS anime_name_ja,
    an_en.name AS anime_name_en,
    aa.alt_names AS anime_alt_names,
    a.category AS anime_type,
    (a.category || ' ' || COALESCE(a.category_number, '')) AS anime_category,

    ag.genres AS anime_genres,
    at.tags AS anime_tags,

    s.name AS song_name,
    CASE
        WHEN sl.type = 1 THEN 'Opening ' || sl.number
        WHEN sl.type = 2 THEN 'Ending ' || sl.number
        WHEN sl.type = 3 THEN 'Insert'
    END AS song_type_name,
    COALESCE(ar.name, g.name) AS song_artist,
    COALESCE(ar_comp.name, g_comp.name) AS song_composer,
    COALESCE(ar_arr.name, g_arr.name) AS song_arranger,

    sl.type AS song_type_id,
    sl.number AS song_type_number,
    s.category AS song_category,

    s.song_artist_id,
    s.song_group_id,
    s.composer_artist_id,
    s.composer_group_id,
    s.arranger_artist_id,
    s.arranger_group_id,

    su.length AS song_length,
    sl.uploaded AS is_uploaded,
    sl.dub AS is_dub,
    sl.rebroadcast AS is_rebroadcast,
    su.hq, su.mq, su.audio, su.difficulty

FROM song_links AS sl
JOIN anime AS a ON a.ann_id = sl.ann_id
JOIN anime_list AS al ON al.ann_id = sl.ann_id
JOIN song AS s ON s.song_id = sl.song_id
LEFT JOIN song_urls AS su ON su.ann_song_id = sl.ann_song_id

LEFT JOIN artist AS ar ON s.song_artist_id = ar.artist_id
LEFT JOIN groups AS g ON s.song_group_id = g.group_id
LEFT JOIN artist AS ar_comp ON s.composer_artist_id = ar_comp.artist_id
LEFT JOIN groups AS g_comp ON s.composer_group_id = g_comp.group_id
LEFT JOIN artist AS ar_arr ON s.arranger_artist_id = ar_arr.artist_id
LEFT JOIN groups AS g_arr ON s.arranger_group_id = g_arr.group_id

LEFT JOIN anime_names AS an_ja ON an_ja.ann_id = sl.ann_id AND an_ja.is_main = 1 AND an_ja.language = 'JA'
LEFT JOIN anime_names AS an_en ON an_en.ann_id = sl.ann_id AND an_en.is_main = 1 AND an_en.language = 'EN'

LEFT JOIN anime_alt AS aa ON aa.ann_id = sl.ann_id
LEFT JOIN anime_genres_cte AS ag ON ag.ann_id = sl.ann_id
LEFT JOIN anime_tags_cte AS at ON at.ann_id = sl.ann_id
"#;

/// Fixed secondary index set over every id, year, flag and range column the
/// downstream ad-hoc queries filter or sort on
const MAT_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_song_full_mat_ann_song_id ON song_full_mat(ann_song_id)",
    "CREATE INDEX IF NOT EXISTS idx_song_full_mat_song_id ON song_full_mat(song_id)",
    "CREATE INDEX IF NOT EXISTS idx_song_full_mat_ann_id ON song_full_mat(ann_id)",
    "CREATE INDEX IF NOT EXISTS idx_song_full_mat_mal_id ON song_full_mat(mal_id)",
    "CREATE INDEX IF NOT EXISTS idx_song_full_mat_anilist_id ON song_full_mat(anilist_id)",
    "CREATE INDEX IF NOT EXISTS idx_song_full_mat_kitsu_id ON song_full_mat(kitsu_id)",
    "CREATE INDEX IF NOT EXISTS idx_song_full_mat_anime_year ON song_full_mat(anime_year)",
    "CREATE INDEX IF NOT EXISTS idx_song_full_mat_anime_season_id ON song_full_mat(anime_season_id)",
    "CREATE INDEX IF NOT EXISTS idx_song_full_mat_song_type_id ON song_full_mat(song_type_id)",
    "CREATE INDEX IF NOT EXISTS idx_song_full_mat_song_type_number ON song_full_mat(song_type_number)",
    "CREATE INDEX IF NOT EXISTS idx_song_full_mat_song_category ON song_full_mat(song_category)",
    "CREATE INDEX IF NOT EXISTS idx_song_full_mat_song_artist_id ON song_full_mat(song_artist_id)",
    "CREATE INDEX IF NOT EXISTS idx_song_full_mat_song_group_id ON song_full_mat(song_group_id)",
    "CREATE INDEX IF NOT EXISTS idx_song_full_mat_composer_artist_id ON song_full_mat(composer_artist_id)",
    "CREATE INDEX IF NOT EXISTS idx_song_full_mat_composer_group_id ON song_full_mat(composer_group_id)",
    "CREATE INDEX IF NOT EXISTS idx_song_full_mat_arranger_artist_id ON song_full_mat(arranger_artist_id)",
    "CREATE INDEX IF NOT EXISTS idx_song_full_mat_arranger_group_id ON song_full_mat(arranger_group_id)",
    "CREATE INDEX IF NOT EXISTS idx_song_full_mat_song_length ON song_full_mat(song_length)",
    "CREATE INDEX IF NOT EXISTS idx_song_full_mat_is_uploaded ON song_full_mat(is_uploaded)",
    "CREATE INDEX IF NOT EXISTS idx_song_full_mat_is_dub ON song_full_mat(is_dub)",
    "CREATE INDEX IF NOT EXISTS idx_song_full_mat_is_rebroadcast ON song_full_mat(is_rebroadcast)",
    "CREATE INDEX IF NOT EXISTS idx_song_full_mat_difficulty ON song_full_mat(difficulty)",
];

/// Rebuild song_full_mat from scratch, returning the row count
///
/// All-or-nothing: the drop, the create-as-select, and the index builds
/// commit together or not at all.
pub async fn rebuild_song_full_mat(pool: &SqlitePool) -> Result<u64> {
    info!("Building materialized table song_full_mat");

    let mut tx = pool.begin().await?;

    sqlx::query("DROP TABLE IF EXISTS song_full_mat")
        .execute(&mut *tx)
        .await?;
    sqlx::query(MAT_SELECT).execute(&mut *tx).await?;
    for statement in MAT_INDEXES {
        sqlx::query(statement).execute(&mut *tx).await?;
    }

    tx.commit().await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM song_full_mat")
        .fetch_one(pool)
        .await?;
    info!("song_full_mat built with {} rows and {} indexes", count, MAT_INDEXES.len());

    Ok(count as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use asdb_common::db::init_memory_database;

    async fn seed_track(pool: &SqlitePool, ann_id: i64, season_id: i64, with_list_row: bool) {
        sqlx::query("INSERT INTO artist (artist_id, name) VALUES (1, 'A')")
            .execute(pool)
            .await
            .ok();
        sqlx::query(
            "INSERT OR REPLACE INTO song (song_id, name, song_artist_id, category) VALUES (?, 'S', 1, 1)",
        )
        .bind(ann_id * 10)
        .execute(pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO anime (ann_id, category, category_number, year, season_id) \
             VALUES (?, 'TV', NULL, 2021, ?)",
        )
        .bind(ann_id)
        .bind(season_id)
        .execute(pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO song_links (ann_song_id, song_id, ann_id, number, type, uploaded, rebroadcast, dub) \
             VALUES (?, ?, ?, 1, 1, 1, 0, 0)",
        )
        .bind(ann_id * 100)
        .bind(ann_id * 10)
        .bind(ann_id)
        .execute(pool)
        .await
        .unwrap();
        if with_list_row {
            sqlx::query("INSERT INTO anime_list (ann_id, mal_id) VALUES (?, ?)")
                .bind(ann_id)
                .bind(ann_id + 9000)
                .execute(pool)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn one_row_per_link_and_curated_ids_required() {
        let pool = init_memory_database().await.unwrap();
        seed_track(&pool, 1, 2, true).await;
        seed_track(&pool, 2, 0, false).await; // no anime_list row

        let rows = rebuild_song_full_mat(&pool).await.unwrap();
        assert_eq!(rows, 1);

        let ann_song_id: i64 = sqlx::query_scalar("SELECT ann_song_id FROM song_full_mat")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(ann_song_id, 100);
    }

    #[tokio::test]
    async fn season_and_track_type_labels() {
        let pool = init_memory_database().await.unwrap();
        seed_track(&pool, 1, 2, true).await;
        seed_track(&pool, 2, 7, true).await; // out-of-range season

        rebuild_song_full_mat(&pool).await.unwrap();

        let (season, type_name): (Option<String>, Option<String>) = sqlx::query_as(
            "SELECT anime_season_text, song_type_name FROM song_full_mat WHERE ann_id = 1",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(season.as_deref(), Some("Summer"));
        assert_eq!(type_name.as_deref(), Some("Opening 1"));

        let season: Option<String> =
            sqlx::query_scalar("SELECT anime_season_text FROM song_full_mat WHERE ann_id = 2")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(season, None);
    }

    #[tokio::test]
    async fn missing_media_row_still_materializes() {
        let pool = init_memory_database().await.unwrap();
        seed_track(&pool, 1, 1, true).await;

        rebuild_song_full_mat(&pool).await.unwrap();

        let (hq, artist): (Option<String>, Option<String>) =
            sqlx::query_as("SELECT hq, song_artist FROM song_full_mat WHERE ann_id = 1")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(hq, None);
        assert_eq!(artist.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn rebuild_is_repeatable() {
        let pool = init_memory_database().await.unwrap();
        seed_track(&pool, 1, 2, true).await;

        assert_eq!(rebuild_song_full_mat(&pool).await.unwrap(), 1);
        assert_eq!(rebuild_song_full_mat(&pool).await.unwrap(), 1);
    }
}
