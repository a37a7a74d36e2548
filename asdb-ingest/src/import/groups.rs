//! Group delta import
//!
//! Groups carry three dependent relations: artist members, sub-groups (the
//! group-of-groups adjacency, cycles tolerated), and alt-name links. All
//! three are add-only with duplicate pairs skipped at the storage layer.

use super::{existing_ids, rows_per_batch};
use crate::datasets::{parse_records, Dataset, GroupRecord};
use crate::report::{EntityCounts, GroupImportSummary, ImportReporter};
use asdb_common::Result;
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};

/// Import the group dataset, returning the step summary
pub async fn import_groups(
    pool: &SqlitePool,
    data: &Dataset,
    reporter: &dyn ImportReporter,
) -> Result<GroupImportSummary> {
    if data.is_empty() {
        reporter.empty_dataset("group");
        return Ok(GroupImportSummary::default());
    }

    let batch = parse_records::<GroupRecord>(data, "group");
    let records = batch.records;

    let mut tx = pool.begin().await?;
    let existing = existing_ids(&mut tx, "groups", "group_id").await?;
    let store_was_populated = !existing.is_empty();

    for chunk in records.chunks(rows_per_batch(2)) {
        let mut qb = QueryBuilder::new("INSERT OR REPLACE INTO groups (group_id, name) ");
        qb.push_values(chunk, |mut row, rec| {
            row.push_bind(rec.group_id);
            row.push_bind(&rec.name);
        });
        qb.build().execute(&mut *tx).await?;
    }

    let member_pairs: Vec<(i64, i64)> = records
        .iter()
        .flat_map(|rec| rec.artist_members.iter().map(|a| (rec.group_id, *a)))
        .collect();
    let subgroup_pairs: Vec<(i64, i64)> = records
        .iter()
        .flat_map(|rec| rec.group_members.iter().map(|c| (rec.group_id, *c)))
        .collect();
    let alt_pairs: Vec<(i64, i64)> = records
        .iter()
        .flat_map(|rec| rec.alt_name_links.iter().map(|alt| (rec.group_id, *alt)))
        .collect();

    let members_inserted = insert_pairs(
        &mut tx,
        "INSERT OR IGNORE INTO group_artist (group_id, artist_id) ",
        &member_pairs,
    )
    .await?;
    let subgroups_inserted = insert_pairs(
        &mut tx,
        "INSERT OR IGNORE INTO group_group (parent_group_id, child_group_id) ",
        &subgroup_pairs,
    )
    .await?;
    let alt_names_inserted = insert_pairs(
        &mut tx,
        "INSERT OR IGNORE INTO group_alt_name (main_group_id, alt_group_id) ",
        &alt_pairs,
    )
    .await?;

    tx.commit().await?;

    let created = records
        .iter()
        .filter(|rec| !existing.contains(&rec.group_id))
        .count();
    let counts = EntityCounts {
        total: records.len(),
        created,
        updated: records.len() - created,
        rejected: batch.rejected,
    };

    reporter.entities_imported("groups", &counts);
    if store_was_populated && created > 0 {
        let samples: Vec<(i64, String)> = records
            .iter()
            .filter(|rec| !existing.contains(&rec.group_id))
            .take(3)
            .map(|rec| (rec.group_id, rec.name.clone()))
            .collect();
        reporter.new_entities("groups", &samples, created);
    }
    if members_inserted > 0 {
        reporter.relations_inserted("group-artist membership", members_inserted);
    }
    if subgroups_inserted > 0 {
        reporter.relations_inserted("group-group membership", subgroups_inserted);
    }
    if alt_names_inserted > 0 {
        reporter.relations_inserted("group alt-name", alt_names_inserted);
    }

    Ok(GroupImportSummary {
        entities: counts,
        members_inserted,
        subgroups_inserted,
        alt_names_inserted,
    })
}

async fn insert_pairs(
    tx: &mut Transaction<'_, Sqlite>,
    statement: &str,
    pairs: &[(i64, i64)],
) -> Result<u64> {
    let mut inserted = 0u64;
    for chunk in pairs.chunks(rows_per_batch(2)) {
        let mut qb = QueryBuilder::new(statement);
        qb.push_values(chunk, |mut row, pair| {
            row.push_bind(pair.0);
            row.push_bind(pair.1);
        });
        inserted += qb.build().execute(&mut **tx).await?.rows_affected();
    }
    Ok(inserted)
}
