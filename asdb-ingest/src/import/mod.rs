//! Delta importers
//!
//! Each importer reconciles one dataset against the rows already stored:
//! read the full id set in one pass, partition incoming records into new vs
//! existing, bulk-upsert with replace-on-conflict semantics (an incoming
//! record always overwrites the stored row in full), then insert dependent
//! relation pairs with skip-on-duplicate semantics. Every importer runs in
//! its own transaction; a storage failure rolls that step back and aborts
//! the run.
//!
//! Import order is load-bearing: artists and groups before songs (songs
//! reference them), songs before anime (song links reference songs). Only
//! [`run_full_import`] may invoke the importers.

pub mod anime;
pub mod artists;
pub mod groups;
pub mod songs;

use crate::datasets::{load_dataset, Dataset};
use crate::materialize;
use crate::report::{
    AnimeImportSummary, ArtistImportSummary, GroupImportSummary, ImportReporter,
    SongImportSummary,
};
use crate::search;
use asdb_common::config::IngestConfig;
use asdb_common::Result;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::HashSet;
use tracing::{info, warn};

/// Bind-parameter budget per statement; keeps batched inserts size-bounded
/// even on SQLite builds with the historical 999-variable limit
pub(crate) const BIND_LIMIT: usize = 900;

/// Rows per multi-row statement for a table with `columns` bind slots each
pub(crate) fn rows_per_batch(columns: usize) -> usize {
    (BIND_LIMIT / columns).max(1)
}

/// Read the full set of ids currently present in a table (one pass)
pub(crate) async fn existing_ids(
    tx: &mut Transaction<'_, Sqlite>,
    table: &str,
    column: &str,
) -> Result<HashSet<i64>> {
    // table/column are compile-time constants from the importers, never input
    let sql = format!("SELECT {column} FROM {table}");
    let ids: Vec<i64> = sqlx::query_scalar(&sql).fetch_all(&mut **tx).await?;
    Ok(ids.into_iter().collect())
}

/// The four datasets of one import run
#[derive(Debug, Default)]
pub struct DatasetBundle {
    pub artists: Dataset,
    pub groups: Dataset,
    pub songs: Dataset,
    pub anime: Dataset,
}

impl DatasetBundle {
    /// Load all four dataset files; each degrades to empty independently
    pub fn load(config: &IngestConfig) -> Self {
        Self {
            artists: load_dataset(&config.artist_map),
            groups: load_dataset(&config.group_map),
            songs: load_dataset(&config.song_map),
            anime: load_dataset(&config.anime_map),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.artists.is_empty()
            && self.groups.is_empty()
            && self.songs.is_empty()
            && self.anime.is_empty()
    }
}

/// Outcome of a full pipeline run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSummary {
    pub artists: ArtistImportSummary,
    pub groups: GroupImportSummary,
    pub songs: SongImportSummary,
    pub anime: AnimeImportSummary,
    /// Rows in the rebuilt song_full_mat table
    pub materialized_rows: u64,
    /// Rows copied into the rebuilt song_search index
    pub indexed_rows: u64,
}

/// Run the whole pipeline: ordered imports, materialization, index rebuild
///
/// Returns `None` when every dataset is empty (nothing to do). Each step
/// executes in its own transaction; the first storage failure halts the run
/// with that step rolled back and earlier steps already committed.
pub async fn run_full_import(
    pool: &SqlitePool,
    bundle: &DatasetBundle,
    reporter: &dyn ImportReporter,
) -> Result<Option<PipelineSummary>> {
    if bundle.is_empty() {
        warn!("All datasets are empty, nothing to import");
        return Ok(None);
    }

    // Artists and groups first (no dependencies)
    let artists = artists::import_artists(pool, &bundle.artists, reporter).await?;
    let groups = groups::import_groups(pool, &bundle.groups, reporter).await?;

    // Songs next (reference artists/groups)
    let songs = songs::import_songs(pool, &bundle.songs, reporter).await?;

    // Anime, names and song links last (links reference songs)
    let anime = anime::import_anime(pool, &bundle.anime, reporter).await?;

    let materialized_rows = materialize::rebuild_song_full_mat(pool).await?;
    let indexed_rows = search::rebuild_song_search(pool).await?;

    info!(
        "Import complete: {} materialized rows, {} indexed rows",
        materialized_rows, indexed_rows
    );

    Ok(Some(PipelineSummary {
        artists,
        groups,
        songs,
        anime,
        materialized_rows,
        indexed_rows,
    }))
}
