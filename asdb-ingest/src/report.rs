//! Import reporting
//!
//! The pipeline never touches global diagnostic state directly; it reports
//! through an injected [`ImportReporter`]. The default implementation
//! forwards to `tracing`, and tests substitute a recorder.

use tracing::{info, warn};

/// Per-entity delta-import counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
    /// Records that passed parsing and were written
    pub total: usize,
    /// Ids not previously present
    pub created: usize,
    /// Ids already present, fully replaced
    pub updated: usize,
    /// Records rejected before partitioning (missing/malformed fields)
    pub rejected: usize,
}

/// Summary of one artist import step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArtistImportSummary {
    pub entities: EntityCounts,
    /// Alt-name pairs actually inserted (duplicates skipped)
    pub alt_names_inserted: u64,
}

/// Summary of one group import step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupImportSummary {
    pub entities: EntityCounts,
    pub members_inserted: u64,
    pub subgroups_inserted: u64,
    pub alt_names_inserted: u64,
}

/// Summary of one song import step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SongImportSummary {
    pub entities: EntityCounts,
}

/// Summary of one anime import step (including names and song links)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnimeImportSummary {
    pub entities: EntityCounts,
    /// Display-name rows written (full replacement per anime)
    pub names_inserted: u64,
    /// Song-link rows committed
    pub links_inserted: u64,
    /// Song links dropped because their song id resolved to nothing
    pub links_dropped: usize,
}

/// Reporting interface the pipeline calls into
///
/// Implementations must tolerate being called from any step in any order;
/// the pipeline holds no reporting state of its own.
pub trait ImportReporter: Send + Sync {
    /// A dataset arrived empty; the corresponding step is a no-op
    fn empty_dataset(&self, entity: &str);

    /// An entity batch was committed
    fn entities_imported(&self, entity: &str, counts: &EntityCounts);

    /// Newly discovered entities, sampled for readability
    ///
    /// Only emitted when the store already had rows for this entity, i.e.
    /// not on first population.
    fn new_entities(&self, entity: &str, samples: &[(i64, String)], total_new: usize);

    /// Relation pair rows actually inserted (skip-on-duplicate batches)
    fn relations_inserted(&self, relation: &str, count: u64);

    /// Song links dropped by the referential validator
    fn links_dropped(&self, count: usize);
}

/// Default reporter backed by `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ImportReporter for LogReporter {
    fn empty_dataset(&self, entity: &str) {
        warn!("No {} data to import", entity);
    }

    fn entities_imported(&self, entity: &str, counts: &EntityCounts) {
        if counts.rejected > 0 {
            warn!("Rejected {} malformed {} records", counts.rejected, entity);
        }
        info!(
            "Imported {} {}: {} new, {} updated",
            counts.total, entity, counts.created, counts.updated
        );
    }

    fn new_entities(&self, entity: &str, samples: &[(i64, String)], total_new: usize) {
        let listed: Vec<String> = samples
            .iter()
            .map(|(id, name)| format!("{} (ID: {})", name, id))
            .collect();
        info!("Discovered {} new {}: {}", total_new, entity, listed.join(", "));
        if total_new > samples.len() {
            info!("   ... and {} more", total_new - samples.len());
        }
    }

    fn relations_inserted(&self, relation: &str, count: u64) {
        info!("Inserted {} {} rows", count, relation);
    }

    fn links_dropped(&self, count: usize) {
        warn!("Dropped {} song links with unresolvable song ids", count);
    }
}
