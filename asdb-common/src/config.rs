//! Configuration for the ingest pipeline
//!
//! A small TOML file names the database location and the four dataset files.
//! Every field has a default matching the conventional file layout, so the
//! pipeline runs with no config file at all. A missing or unparseable config
//! file degrades to the defaults with a warning; it never aborts the run.

use crate::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Pipeline configuration loaded from TOML
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    /// SQLite database file
    pub database_path: PathBuf,
    /// Anime dataset (keyed by ANN id)
    pub anime_map: PathBuf,
    /// Song dataset (keyed by song id)
    pub song_map: PathBuf,
    /// Artist dataset (keyed by artist id)
    pub artist_map: PathBuf,
    /// Group dataset (keyed by group id)
    pub group_map: PathBuf,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("anisong.db"),
            anime_map: PathBuf::from("animeMap.json"),
            song_map: PathBuf::from("songMap.json"),
            artist_map: PathBuf::from("artistMap.json"),
            group_map: PathBuf::from("groupMap.json"),
        }
    }
}

impl IngestConfig {
    /// Load configuration from a TOML file, falling back to defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file not found: {} (using defaults)", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        match toml::from_str::<IngestConfig>(&contents) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) => {
                warn!(
                    "Failed to parse config file {}: {} (using defaults)",
                    path.display(),
                    e
                );
                Ok(Self::default())
            }
        }
    }
}
