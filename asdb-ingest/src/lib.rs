//! asdb-ingest library interface
//!
//! Reconciles the four anisong datasets (anime, songs, artists, groups) into
//! the normalized schema, rebuilds the denormalized `song_full_mat` table,
//! and rebuilds the standalone `song_search` FTS5 index.

pub mod datasets;
pub mod import;
pub mod materialize;
pub mod report;
pub mod search;
pub mod stats;

pub use crate::report::{ImportReporter, LogReporter};
