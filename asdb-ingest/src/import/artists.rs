//! Artist delta import

use super::{existing_ids, rows_per_batch};
use crate::datasets::{parse_records, ArtistRecord, Dataset};
use crate::report::{ArtistImportSummary, EntityCounts, ImportReporter};
use asdb_common::Result;
use sqlx::{QueryBuilder, SqlitePool};

/// Import the artist dataset, returning the step summary
pub async fn import_artists(
    pool: &SqlitePool,
    data: &Dataset,
    reporter: &dyn ImportReporter,
) -> Result<ArtistImportSummary> {
    if data.is_empty() {
        reporter.empty_dataset("artist");
        return Ok(ArtistImportSummary::default());
    }

    let batch = parse_records::<ArtistRecord>(data, "artist");
    let records = batch.records;

    let mut tx = pool.begin().await?;
    let existing = existing_ids(&mut tx, "artist", "artist_id").await?;
    let store_was_populated = !existing.is_empty();

    for chunk in records.chunks(rows_per_batch(2)) {
        let mut qb = QueryBuilder::new("INSERT OR REPLACE INTO artist (artist_id, name) ");
        qb.push_values(chunk, |mut row, rec| {
            row.push_bind(rec.artist_id);
            row.push_bind(&rec.name);
        });
        qb.build().execute(&mut *tx).await?;
    }

    let pairs: Vec<(i64, i64)> = records
        .iter()
        .flat_map(|rec| rec.alt_name_links.iter().map(|alt| (rec.artist_id, *alt)))
        .collect();

    let mut alt_names_inserted = 0u64;
    for chunk in pairs.chunks(rows_per_batch(2)) {
        let mut qb =
            QueryBuilder::new("INSERT OR IGNORE INTO artist_alt_name (artist_id, alt_id) ");
        qb.push_values(chunk, |mut row, pair| {
            row.push_bind(pair.0);
            row.push_bind(pair.1);
        });
        alt_names_inserted += qb.build().execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;

    let created = records
        .iter()
        .filter(|rec| !existing.contains(&rec.artist_id))
        .count();
    let counts = EntityCounts {
        total: records.len(),
        created,
        updated: records.len() - created,
        rejected: batch.rejected,
    };

    reporter.entities_imported("artists", &counts);
    if store_was_populated && created > 0 {
        let samples: Vec<(i64, String)> = records
            .iter()
            .filter(|rec| !existing.contains(&rec.artist_id))
            .take(3)
            .map(|rec| (rec.artist_id, rec.name.clone()))
            .collect();
        reporter.new_entities("artists", &samples, created);
    }
    if alt_names_inserted > 0 {
        reporter.relations_inserted("artist alt-name", alt_names_inserted);
    }

    Ok(ArtistImportSummary {
        entities: counts,
        alt_names_inserted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::LogReporter;
    use asdb_common::db::init_memory_database;
    use serde_json::json;

    fn dataset(values: &[serde_json::Value]) -> Dataset {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn partitions_new_and_existing() {
        let pool = init_memory_database().await.unwrap();

        let first = dataset(&[json!({"songArtistId": 1, "name": "A"})]);
        let summary = import_artists(&pool, &first, &LogReporter).await.unwrap();
        assert_eq!(summary.entities.created, 1);
        assert_eq!(summary.entities.updated, 0);

        // X exists, Y is new: X classified updated, Y created
        let second = dataset(&[
            json!({"songArtistId": 1, "name": "A renamed"}),
            json!({"songArtistId": 2, "name": "B"}),
        ]);
        let summary = import_artists(&pool, &second, &LogReporter).await.unwrap();
        assert_eq!(summary.entities.created, 1);
        assert_eq!(summary.entities.updated, 1);

        // Existing content is fully replaced, last write wins
        let name: String = sqlx::query_scalar("SELECT name FROM artist WHERE artist_id = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(name, "A renamed");
    }

    #[tokio::test]
    async fn alt_name_pairs_deduplicate_across_imports() {
        let pool = init_memory_database().await.unwrap();
        let data = dataset(&[json!({"songArtistId": 1, "name": "A", "altNameLinks": [7]})]);

        let summary = import_artists(&pool, &data, &LogReporter).await.unwrap();
        assert_eq!(summary.alt_names_inserted, 1);

        let summary = import_artists(&pool, &data, &LogReporter).await.unwrap();
        assert_eq!(summary.alt_names_inserted, 0);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM artist_alt_name")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn empty_dataset_is_a_no_op() {
        let pool = init_memory_database().await.unwrap();
        let summary = import_artists(&pool, &Dataset::new(), &LogReporter)
            .await
            .unwrap();
        assert_eq!(summary, ArtistImportSummary::default());
    }
}
