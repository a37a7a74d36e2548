//! Tests for database initialization and schema creation

use asdb_common::db::init_database;
use std::path::PathBuf;

fn temp_db_path(tag: &str) -> PathBuf {
    let dir = tempfile::tempdir().expect("tempdir failed");
    // Keep the directory alive by leaking it; the OS reclaims /tmp
    let path = dir.path().join(format!("asdb-test-{tag}.db"));
    std::mem::forget(dir);
    path
}

#[tokio::test]
async fn creates_database_when_missing() {
    let db_path = temp_db_path("create");
    assert!(!db_path.exists());

    let result = init_database(&db_path).await;
    assert!(result.is_ok(), "initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "database file was not created");
}

#[tokio::test]
async fn opens_existing_database() {
    let db_path = temp_db_path("reopen");

    let pool1 = init_database(&db_path).await.expect("first open failed");
    drop(pool1);

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "failed to reopen: {:?}", pool2.err());
}

#[tokio::test]
async fn schema_survives_reinitialization_with_data() {
    let db_path = temp_db_path("repopulate");

    let pool = init_database(&db_path).await.expect("open failed");
    sqlx::query("INSERT INTO artist (artist_id, name) VALUES (1, 'LiSA')")
        .execute(&pool)
        .await
        .unwrap();
    drop(pool);

    // Re-running initialization against a populated store must not touch rows
    let pool = init_database(&db_path).await.expect("reopen failed");
    let name: String = sqlx::query_scalar("SELECT name FROM artist WHERE artist_id = 1")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(name, "LiSA");
}
