//! Normalized schema for the anisong database
//!
//! Two families of tables live here. The dataset-fed tables (anime, names,
//! songs, links, artists, groups and their relation pairs) are written by the
//! delta importers. The curated tables (external catalog ids, genre/tag
//! taxonomies, per-track media URLs) are populated out-of-band and only read
//! during materialization; their schema is still created here so the full
//! structure exists before anything references it.
//!
//! Every statement is `IF NOT EXISTS`, so initialization is idempotent.

use crate::Result;
use sqlx::SqlitePool;

/// Create every table, uniqueness constraint, and lookup index
///
/// Idempotent; safe to invoke on every run. Any DDL failure propagates — a
/// broken schema must not proceed to import.
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    create_anime_table(pool).await?;
    create_anime_names_table(pool).await?;
    create_song_table(pool).await?;
    create_song_links_table(pool).await?;
    create_artist_tables(pool).await?;
    create_group_tables(pool).await?;

    // Curated extension tables (read-only for the pipeline)
    create_anime_list_table(pool).await?;
    create_anime_genre_table(pool).await?;
    create_anime_tag_table(pool).await?;
    create_song_urls_table(pool).await?;

    Ok(())
}

async fn create_anime_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS anime (
            ann_id INTEGER PRIMARY KEY,
            category TEXT,
            category_number INTEGER,
            year INTEGER,
            season_id INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_anime_names_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS anime_names (
            ann_id INTEGER,
            language TEXT,
            name TEXT,
            is_main BOOLEAN,
            FOREIGN KEY (ann_id) REFERENCES anime(ann_id),
            PRIMARY KEY (ann_id, language, name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // ann_id index serves the delete-then-insert name replacement
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_anime_names_ann_id ON anime_names(ann_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_anime_names_unique ON anime_names(ann_id, language, name)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_song_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS song (
            song_id INTEGER PRIMARY KEY,
            name TEXT,
            song_artist_id INTEGER,
            composer_artist_id INTEGER,
            arranger_artist_id INTEGER,
            song_group_id INTEGER,
            composer_group_id INTEGER,
            arranger_group_id INTEGER,
            category INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Role-column indexes used by the materializer's artist/group joins
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_song_artist ON song(song_artist_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_song_composer ON song(composer_artist_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_song_arranger ON song(arranger_artist_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_song_group ON song(song_group_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_song_composer_group ON song(composer_group_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_song_arranger_group ON song(arranger_group_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_song_links_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS song_links (
            ann_song_id INTEGER PRIMARY KEY,
            song_id INTEGER REFERENCES song(song_id),
            ann_id INTEGER REFERENCES anime(ann_id),
            number INTEGER,
            type INTEGER,
            uploaded BOOLEAN,
            rebroadcast BOOLEAN,
            dub BOOLEAN
        )
        "#,
    )
    .execute(pool)
    .await?;

    // song_id index serves the referential validator's existence probe
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_song_links_song_id ON song_links(song_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_artist_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artist (
            artist_id INTEGER PRIMARY KEY,
            name TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artist_alt_name (
            artist_id INTEGER,
            alt_id INTEGER,
            FOREIGN KEY (artist_id) REFERENCES artist(artist_id),
            FOREIGN KEY (alt_id) REFERENCES artist(artist_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_artist_alt_unique ON artist_alt_name(artist_id, alt_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_group_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS groups (
            group_id INTEGER PRIMARY KEY,
            name TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS group_alt_name (
            main_group_id INTEGER,
            alt_group_id INTEGER,
            PRIMARY KEY (main_group_id, alt_group_id),
            FOREIGN KEY (main_group_id) REFERENCES groups(group_id),
            FOREIGN KEY (alt_group_id) REFERENCES groups(group_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Membership is plain adjacency over opaque ids; the group-of-groups
    // relation may contain cycles and is never traversed recursively
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS group_artist (
            artist_id INTEGER,
            group_id INTEGER,
            FOREIGN KEY (artist_id) REFERENCES artist(artist_id),
            FOREIGN KEY (group_id) REFERENCES groups(group_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS group_group (
            parent_group_id INTEGER,
            child_group_id INTEGER,
            FOREIGN KEY (parent_group_id) REFERENCES groups(group_id),
            FOREIGN KEY (child_group_id) REFERENCES groups(group_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_group_artist_unique ON group_artist(artist_id, group_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_group_group_unique ON group_group(parent_group_id, child_group_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_anime_list_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS anime_list (
            ann_id INTEGER PRIMARY KEY,
            mal_id INTEGER,
            kitsu_id INTEGER,
            anilist_id INTEGER,
            FOREIGN KEY (ann_id) REFERENCES anime(ann_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_anime_genre_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS anime_genre (
            ann_id INTEGER,
            genre_name TEXT NOT NULL,
            FOREIGN KEY (ann_id) REFERENCES anime(ann_id),
            PRIMARY KEY (ann_id, genre_name),
            CHECK (LENGTH(genre_name) > 0 AND LENGTH(genre_name) <= 100)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_anime_tag_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS anime_tag (
            ann_id INTEGER,
            tag_name TEXT NOT NULL,
            FOREIGN KEY (ann_id) REFERENCES anime(ann_id),
            PRIMARY KEY (ann_id, tag_name),
            CHECK (LENGTH(tag_name) > 0 AND LENGTH(tag_name) <= 100)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_song_urls_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS song_urls (
            ann_song_id INTEGER PRIMARY KEY,
            difficulty REAL CHECK (difficulty IS NULL OR (difficulty >= 0 AND difficulty <= 100)),
            hq TEXT CHECK (hq IS NULL OR LENGTH(hq) <= 500),
            mq TEXT CHECK (mq IS NULL OR LENGTH(mq) <= 500),
            audio TEXT CHECK (audio IS NULL OR LENGTH(audio) <= 500),
            length REAL CHECK (length IS NULL OR (length > 0 AND length <= 3600)),
            FOREIGN KEY (ann_song_id) REFERENCES song_links(ann_song_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_song_urls_ann_song_id ON song_urls(ann_song_id)")
        .execute(pool)
        .await?;

    Ok(())
}
