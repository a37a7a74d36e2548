//! Anime delta import: anime rows, display names, and song links
//!
//! Display names are authoritative from the latest snapshot, so they are
//! fully replaced (delete-then-insert) per imported anime id — unlike the
//! add-only relation pairs elsewhere.
//!
//! The referential validator lives here: song links referencing a song id
//! that does not exist at commit time are dropped per-row, and the
//! resolvable remainder still commits.

use super::{existing_ids, rows_per_batch, BIND_LIMIT};
use crate::datasets::{parse_records, AnimeRecord, Dataset};
use crate::report::{AnimeImportSummary, EntityCounts, ImportReporter};
use asdb_common::Result;
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};
use std::collections::HashSet;

struct NameRow {
    ann_id: i64,
    language: String,
    name: String,
    is_main: bool,
}

struct LinkRow {
    ann_song_id: i64,
    song_id: i64,
    ann_id: i64,
    number: i64,
    link_type: i64,
    uploaded: bool,
    rebroadcast: bool,
    dub: bool,
}

/// Import the anime dataset, returning the step summary
///
/// Songs must already be imported; the orchestrator enforces the ordering.
pub async fn import_anime(
    pool: &SqlitePool,
    data: &Dataset,
    reporter: &dyn ImportReporter,
) -> Result<AnimeImportSummary> {
    if data.is_empty() {
        reporter.empty_dataset("anime");
        return Ok(AnimeImportSummary::default());
    }

    let batch = parse_records::<AnimeRecord>(data, "anime");
    let records = batch.records;

    let mut name_rows = Vec::new();
    let mut link_rows = Vec::new();
    for rec in &records {
        for name in &rec.names {
            name_rows.push(NameRow {
                ann_id: rec.ann_id,
                language: name.language.clone(),
                name: name.name.clone(),
                is_main: rec.is_canonical(name),
            });
        }
        for link in rec.parsed_song_links() {
            link_rows.push(LinkRow {
                ann_song_id: link.ann_song_id,
                song_id: link.song_id,
                ann_id: rec.ann_id,
                number: link.number,
                link_type: link.link_type,
                uploaded: link.uploaded,
                rebroadcast: link.rebroadcast,
                dub: link.dub,
            });
        }
    }

    let mut tx = pool.begin().await?;
    let existing = existing_ids(&mut tx, "anime", "ann_id").await?;
    let store_was_populated = !existing.is_empty();

    for chunk in records.chunks(rows_per_batch(5)) {
        let mut qb = QueryBuilder::new(
            "INSERT OR REPLACE INTO anime (ann_id, category, category_number, year, season_id) ",
        );
        qb.push_values(chunk, |mut row, rec| {
            let (category, category_number) = rec.category.clone().into_parts();
            row.push_bind(rec.ann_id);
            row.push_bind(category);
            row.push_bind(category_number);
            row.push_bind(rec.year);
            row.push_bind(rec.season_id);
        });
        qb.build().execute(&mut *tx).await?;
    }

    // Name sets are replaced wholesale for every imported anime, even when
    // the incoming set is empty
    let imported_ids: Vec<i64> = records.iter().map(|rec| rec.ann_id).collect();
    for chunk in imported_ids.chunks(BIND_LIMIT) {
        let mut qb = QueryBuilder::new("DELETE FROM anime_names WHERE ann_id IN (");
        let mut separated = qb.separated(", ");
        for id in chunk {
            separated.push_bind(*id);
        }
        qb.push(")");
        qb.build().execute(&mut *tx).await?;
    }

    let mut names_inserted = 0u64;
    for chunk in name_rows.chunks(rows_per_batch(4)) {
        let mut qb = QueryBuilder::new(
            "INSERT OR REPLACE INTO anime_names (ann_id, language, name, is_main) ",
        );
        qb.push_values(chunk, |mut row, name| {
            row.push_bind(name.ann_id);
            row.push_bind(&name.language);
            row.push_bind(&name.name);
            row.push_bind(name.is_main);
        });
        names_inserted += qb.build().execute(&mut *tx).await?.rows_affected();
    }

    // Referential validation: probe the song table for the referenced ids
    // and drop links whose song does not exist
    let candidate_song_ids: HashSet<i64> = link_rows.iter().map(|l| l.song_id).collect();
    let valid_song_ids = resolve_song_ids(&mut tx, &candidate_song_ids).await?;

    let total_links = link_rows.len();
    let valid_links: Vec<&LinkRow> = link_rows
        .iter()
        .filter(|l| valid_song_ids.contains(&l.song_id))
        .collect();
    let links_dropped = total_links - valid_links.len();
    if links_dropped > 0 {
        reporter.links_dropped(links_dropped);
    }

    let mut links_inserted = 0u64;
    for chunk in valid_links.chunks(rows_per_batch(8)) {
        let mut qb = QueryBuilder::new(
            "INSERT OR REPLACE INTO song_links (ann_song_id, song_id, ann_id, \
             number, type, uploaded, rebroadcast, dub) ",
        );
        qb.push_values(chunk, |mut row, link| {
            row.push_bind(link.ann_song_id);
            row.push_bind(link.song_id);
            row.push_bind(link.ann_id);
            row.push_bind(link.number);
            row.push_bind(link.link_type);
            row.push_bind(link.uploaded);
            row.push_bind(link.rebroadcast);
            row.push_bind(link.dub);
        });
        links_inserted += qb.build().execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;

    let created = records
        .iter()
        .filter(|rec| !existing.contains(&rec.ann_id))
        .count();
    let counts = EntityCounts {
        total: records.len(),
        created,
        updated: records.len() - created,
        rejected: batch.rejected,
    };

    reporter.entities_imported("anime", &counts);
    if store_was_populated && created > 0 {
        let samples: Vec<(i64, String)> = records
            .iter()
            .filter(|rec| !existing.contains(&rec.ann_id))
            .take(3)
            .map(|rec| (rec.ann_id, display_name(rec)))
            .collect();
        reporter.new_entities("anime", &samples, created);
    }
    if names_inserted > 0 {
        reporter.relations_inserted("anime name", names_inserted);
    }
    if links_inserted > 0 {
        reporter.relations_inserted("song link", links_inserted);
    }

    Ok(AnimeImportSummary {
        entities: counts,
        names_inserted,
        links_inserted,
        links_dropped,
    })
}

/// Which of the candidate song ids exist in the song table right now
async fn resolve_song_ids(
    tx: &mut Transaction<'_, Sqlite>,
    candidates: &HashSet<i64>,
) -> Result<HashSet<i64>> {
    let mut valid = HashSet::with_capacity(candidates.len());
    let ids: Vec<i64> = candidates.iter().copied().collect();
    for chunk in ids.chunks(BIND_LIMIT) {
        let mut qb = QueryBuilder::new("SELECT song_id FROM song WHERE song_id IN (");
        let mut separated = qb.separated(", ");
        for id in chunk {
            separated.push_bind(*id);
        }
        qb.push(")");
        let found: Vec<i64> = qb.build_query_scalar().fetch_all(&mut **tx).await?;
        valid.extend(found);
    }
    Ok(valid)
}

/// Best-effort display name for log sampling (JA, then EN, then any)
fn display_name(rec: &AnimeRecord) -> String {
    rec.main_names
        .get("JA")
        .or_else(|| rec.main_names.get("EN"))
        .or_else(|| rec.main_names.values().next())
        .cloned()
        .unwrap_or_else(|| format!("ANN:{}", rec.ann_id))
}
