//! Song delta import
//!
//! A song is independent of any anime until a link binds it to one; only the
//! song row itself is written here.

use super::{existing_ids, rows_per_batch};
use crate::datasets::{parse_records, Dataset, SongRecord};
use crate::report::{EntityCounts, ImportReporter, SongImportSummary};
use asdb_common::Result;
use sqlx::{QueryBuilder, SqlitePool};

/// Import the song dataset, returning the step summary
///
/// Artists and groups must already be imported; the orchestrator enforces
/// the ordering.
pub async fn import_songs(
    pool: &SqlitePool,
    data: &Dataset,
    reporter: &dyn ImportReporter,
) -> Result<SongImportSummary> {
    if data.is_empty() {
        reporter.empty_dataset("song");
        return Ok(SongImportSummary::default());
    }

    let batch = parse_records::<SongRecord>(data, "song");
    let records = batch.records;

    let mut tx = pool.begin().await?;
    let existing = existing_ids(&mut tx, "song", "song_id").await?;
    let store_was_populated = !existing.is_empty();

    for chunk in records.chunks(rows_per_batch(9)) {
        let mut qb = QueryBuilder::new(
            "INSERT OR REPLACE INTO song (song_id, name, \
             song_artist_id, composer_artist_id, arranger_artist_id, \
             song_group_id, composer_group_id, arranger_group_id, category) ",
        );
        qb.push_values(chunk, |mut row, rec| {
            row.push_bind(rec.song_id);
            row.push_bind(&rec.name);
            row.push_bind(rec.song_artist_id);
            row.push_bind(rec.composer_artist_id);
            row.push_bind(rec.arranger_artist_id);
            row.push_bind(rec.song_group_id);
            row.push_bind(rec.composer_group_id);
            row.push_bind(rec.arranger_group_id);
            row.push_bind(rec.category);
        });
        qb.build().execute(&mut *tx).await?;
    }

    tx.commit().await?;

    let created = records
        .iter()
        .filter(|rec| !existing.contains(&rec.song_id))
        .count();
    let counts = EntityCounts {
        total: records.len(),
        created,
        updated: records.len() - created,
        rejected: batch.rejected,
    };

    reporter.entities_imported("songs", &counts);
    if store_was_populated && created > 0 {
        let samples: Vec<(i64, String)> = records
            .iter()
            .filter(|rec| !existing.contains(&rec.song_id))
            .take(3)
            .map(|rec| (rec.song_id, rec.name.clone()))
            .collect();
        reporter.new_entities("songs", &samples, created);
    }

    Ok(SongImportSummary { entities: counts })
}
