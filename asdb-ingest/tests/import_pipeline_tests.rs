//! End-to-end pipeline tests: ordered imports, referential safety,
//! idempotence, materialization and the FTS rebuild working together

use asdb_common::db::init_memory_database;
use asdb_ingest::datasets::Dataset;
use asdb_ingest::import::{run_full_import, DatasetBundle};
use asdb_ingest::report::{EntityCounts, ImportReporter};
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Mutex;

/// Reporter that records what the pipeline tells it
#[derive(Default)]
struct RecordingReporter {
    dropped: Mutex<Vec<usize>>,
    empty: Mutex<Vec<String>>,
}

impl ImportReporter for RecordingReporter {
    fn empty_dataset(&self, entity: &str) {
        self.empty.lock().unwrap().push(entity.to_string());
    }
    fn entities_imported(&self, _entity: &str, _counts: &EntityCounts) {}
    fn new_entities(&self, _entity: &str, _samples: &[(i64, String)], _total_new: usize) {}
    fn relations_inserted(&self, _relation: &str, _count: u64) {}
    fn links_dropped(&self, count: usize) {
        self.dropped.lock().unwrap().push(count);
    }
}

fn one(value: serde_json::Value) -> Dataset {
    let mut data = Dataset::new();
    let key = value
        .as_object()
        .and_then(|o| {
            o.get("songArtistId")
                .or_else(|| o.get("songGroupId"))
                .or_else(|| o.get("songId"))
                .or_else(|| o.get("annId"))
        })
        .and_then(|v| v.as_i64())
        .unwrap_or(0);
    data.insert(key.to_string(), value);
    data
}

fn scenario_bundle() -> DatasetBundle {
    DatasetBundle {
        artists: one(json!({"songArtistId": 1, "name": "A"})),
        groups: Dataset::new(),
        songs: one(json!({"songId": 10, "name": "S", "songArtistId": 1, "category": 1})),
        anime: one(json!({
            "annId": 100,
            "year": 2021,
            "seasonId": 2,
            "category": {"name": "TV"},
            "names": [{"language": "EN", "name": "Show"}],
            "mainNames": {"EN": "Show"},
            "songLinks": {"OP": [{"annSongId": 500, "songId": 10, "number": 1, "type": 1}]}
        })),
    }
}

async fn seed_curated_ids(pool: &SqlitePool, ann_id: i64) {
    sqlx::query("INSERT OR IGNORE INTO anime_list (ann_id, mal_id) VALUES (?, 1)")
        .bind(ann_id)
        .execute(pool)
        .await
        .unwrap();
}

#[tokio::test]
async fn end_to_end_scenario() {
    let pool = init_memory_database().await.unwrap();
    seed_curated_ids(&pool, 100).await;

    let reporter = RecordingReporter::default();
    let summary = run_full_import(&pool, &scenario_bundle(), &reporter)
        .await
        .unwrap()
        .expect("pipeline should run");

    assert_eq!(summary.artists.entities.created, 1);
    assert_eq!(summary.songs.entities.created, 1);
    assert_eq!(summary.anime.links_inserted, 1);
    assert_eq!(summary.materialized_rows, 1);
    assert_eq!(summary.indexed_rows, 1);

    let artist_id: Option<i64> =
        sqlx::query_scalar("SELECT song_artist_id FROM song WHERE song_id = 10")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(artist_id, Some(1));

    let ann_id: i64 = sqlx::query_scalar("SELECT ann_id FROM song_links WHERE ann_song_id = 500")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(ann_id, 100);

    // Re-run with an extra link referencing a nonexistent song: only that
    // link is dropped (count 1), prior data stays intact
    let mut bundle = scenario_bundle();
    bundle.anime = one(json!({
        "annId": 100,
        "year": 2021,
        "seasonId": 2,
        "category": {"name": "TV"},
        "names": [{"language": "EN", "name": "Show"}],
        "mainNames": {"EN": "Show"},
        "songLinks": {"OP": [
            {"annSongId": 500, "songId": 10, "number": 1, "type": 1},
            {"annSongId": 501, "songId": 999, "number": 2, "type": 1}
        ]}
    }));

    let summary = run_full_import(&pool, &bundle, &reporter)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(summary.anime.links_dropped, 1);
    assert_eq!(*reporter.dropped.lock().unwrap(), vec![1]);

    let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM song_links")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(links, 1);

    let ann_id: i64 = sqlx::query_scalar("SELECT ann_id FROM song_links WHERE ann_song_id = 500")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(ann_id, 100);
}

#[tokio::test]
async fn importing_twice_is_idempotent() {
    let pool = init_memory_database().await.unwrap();
    seed_curated_ids(&pool, 100).await;

    let bundle = scenario_bundle();
    run_full_import(&pool, &bundle, &RecordingReporter::default())
        .await
        .unwrap()
        .unwrap();

    let counts_before = table_counts(&pool).await;
    let row_before: (i64, String, i64) = sqlx::query_as(
        "SELECT ann_song_id, anime_season_text, song_id FROM song_full_mat",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    let summary = run_full_import(&pool, &bundle, &RecordingReporter::default())
        .await
        .unwrap()
        .unwrap();

    // Second run classifies everything as updated, creates nothing
    assert_eq!(summary.artists.entities.created, 0);
    assert_eq!(summary.artists.entities.updated, 1);
    assert_eq!(summary.anime.entities.updated, 1);

    let counts_after = table_counts(&pool).await;
    assert_eq!(counts_before, counts_after);

    let row_after: (i64, String, i64) = sqlx::query_as(
        "SELECT ann_song_id, anime_season_text, song_id FROM song_full_mat",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(row_before, row_after);
    assert_eq!(row_after.1, "Summer");
}

#[tokio::test]
async fn empty_bundle_is_a_no_op() {
    let pool = init_memory_database().await.unwrap();

    let result = run_full_import(&pool, &DatasetBundle::default(), &RecordingReporter::default())
        .await
        .unwrap();
    assert!(result.is_none());

    // Nothing materialized either
    let mat: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'song_full_mat'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(mat, 0);
}

#[tokio::test]
async fn search_index_matches_after_full_pipeline() {
    let pool = init_memory_database().await.unwrap();
    seed_curated_ids(&pool, 100).await;

    run_full_import(&pool, &scenario_bundle(), &RecordingReporter::default())
        .await
        .unwrap()
        .unwrap();

    let rowid: i64 =
        sqlx::query_scalar("SELECT rowid FROM song_search WHERE song_search MATCH 'Show'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(rowid, 500);
}

async fn table_counts(pool: &SqlitePool) -> Vec<i64> {
    let mut counts = Vec::new();
    for table in [
        "artist",
        "groups",
        "song",
        "anime",
        "anime_names",
        "song_links",
        "song_full_mat",
        "song_search",
    ] {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .unwrap();
        counts.push(count);
    }
    counts
}
