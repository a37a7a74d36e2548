//! Dataset files and record parsing
//!
//! Each dataset is a JSON object mapping an external id (as text) to a
//! loosely-shaped record. Two degradation policies apply:
//!
//! - A missing or unparseable *file* becomes an empty map with a warning;
//!   the run continues with whatever datasets did load.
//! - A *record* missing a required field, or holding the wrong shape for one
//!   (e.g. an object where a scalar is expected), is rejected and counted;
//!   the rest of the batch continues.
//!
//! All ids are stable, externally-assigned integers; nothing is generated
//! here.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Raw dataset: external id (textual) -> unparsed record
///
/// A BTreeMap keeps iteration order deterministic across runs.
pub type Dataset = BTreeMap<String, serde_json::Value>;

/// Load a dataset file, degrading to an empty map on any failure
pub fn load_dataset(path: &Path) -> Dataset {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!("Could not read dataset {}: {}", path.display(), e);
            return Dataset::new();
        }
    };

    match serde_json::from_str::<Dataset>(&contents) {
        Ok(data) => {
            info!("Loaded {} records from {}", data.len(), path.display());
            data
        }
        Err(e) => {
            warn!("Invalid JSON in dataset {}: {}", path.display(), e);
            Dataset::new()
        }
    }
}

/// Records that survived parsing plus the count of rejects
#[derive(Debug)]
pub struct ParsedBatch<T> {
    pub records: Vec<T>,
    pub rejected: usize,
}

/// Parse every record in a dataset, rejecting malformed ones individually
pub fn parse_records<T: DeserializeOwned>(data: &Dataset, entity: &str) -> ParsedBatch<T> {
    let mut records = Vec::with_capacity(data.len());
    let mut rejected = 0;

    for (key, value) in data {
        match serde_json::from_value::<T>(value.clone()) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!("Rejected {} record {}: {}", entity, key, e);
                rejected += 1;
            }
        }
    }

    ParsedBatch { records, rejected }
}

/// Artist dataset record
#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRecord {
    #[serde(rename = "songArtistId")]
    pub artist_id: i64,
    pub name: String,
    #[serde(rename = "altNameLinks", default)]
    pub alt_name_links: Vec<i64>,
}

/// Group dataset record
#[derive(Debug, Clone, Deserialize)]
pub struct GroupRecord {
    #[serde(rename = "songGroupId")]
    pub group_id: i64,
    pub name: String,
    #[serde(rename = "artistMembers", default)]
    pub artist_members: Vec<i64>,
    #[serde(rename = "groupMembers", default)]
    pub group_members: Vec<i64>,
    #[serde(rename = "altNameLinks", default)]
    pub alt_name_links: Vec<i64>,
}

/// Song dataset record
///
/// Each of the three roles (performer, composer, arranger) points to an
/// artist or a group, never both; the source guarantees at most one of each
/// pair is set and the schema carries both columns as-is.
#[derive(Debug, Clone, Deserialize)]
pub struct SongRecord {
    #[serde(rename = "songId")]
    pub song_id: i64,
    pub name: String,
    pub category: i64,
    #[serde(rename = "songArtistId", default)]
    pub song_artist_id: Option<i64>,
    #[serde(rename = "composerArtistId", default)]
    pub composer_artist_id: Option<i64>,
    #[serde(rename = "arrangerArtistId", default)]
    pub arranger_artist_id: Option<i64>,
    #[serde(rename = "songGroupId", default)]
    pub song_group_id: Option<i64>,
    #[serde(rename = "composerGroupId", default)]
    pub composer_group_id: Option<i64>,
    #[serde(rename = "arrangerGroupId", default)]
    pub arranger_group_id: Option<i64>,
}

/// Anime classification, sometimes structured, sometimes a bare label
///
/// Normalized into `(name, Option<number>)` at ingestion; the ambiguous shape
/// never travels further than this module.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Classification {
    Structured {
        name: String,
        #[serde(default)]
        number: Option<i64>,
    },
    Label(String),
}

impl Classification {
    pub fn into_parts(self) -> (String, Option<i64>) {
        match self {
            Classification::Structured { name, number } => (name, number),
            Classification::Label(name) => (name, None),
        }
    }
}

/// One display name for an anime
#[derive(Debug, Clone, Deserialize)]
pub struct NameRecord {
    pub language: String,
    pub name: String,
}

/// One song-to-anime link (a broadcast occurrence of a track)
///
/// `uploaded`, `rebroadcast`, and `dub` are properties of the occurrence,
/// not of the song.
#[derive(Debug, Clone, Deserialize)]
pub struct SongLinkRecord {
    #[serde(rename = "annSongId")]
    pub ann_song_id: i64,
    #[serde(rename = "songId")]
    pub song_id: i64,
    #[serde(default)]
    pub number: i64,
    #[serde(rename = "type", default)]
    pub link_type: i64,
    #[serde(default)]
    pub uploaded: bool,
    #[serde(default)]
    pub rebroadcast: bool,
    #[serde(default)]
    pub dub: bool,
}

/// Anime dataset record
#[derive(Debug, Clone, Deserialize)]
pub struct AnimeRecord {
    #[serde(rename = "annId")]
    pub ann_id: i64,
    pub category: Classification,
    pub year: i64,
    #[serde(rename = "seasonId")]
    pub season_id: i64,
    #[serde(default)]
    pub names: Vec<NameRecord>,
    #[serde(rename = "mainNames", default)]
    pub main_names: BTreeMap<String, String>,
    #[serde(rename = "songLinks", default)]
    pub song_links: BTreeMap<String, serde_json::Value>,
}

impl AnimeRecord {
    /// Whether a name is the canonical one for its language
    pub fn is_canonical(&self, name: &NameRecord) -> bool {
        self.main_names.get(&name.language) == Some(&name.name)
    }

    /// Extract the song links, skipping malformed entries with a warning
    ///
    /// The map is keyed by song type ("OP", "ED", ...); each value should be
    /// a list of link objects. Non-list values and unparseable items are
    /// dropped individually rather than rejecting the whole anime.
    pub fn parsed_song_links(&self) -> Vec<SongLinkRecord> {
        let mut links = Vec::new();
        for (song_type, value) in &self.song_links {
            let items = match value.as_array() {
                Some(items) => items,
                None => {
                    warn!(
                        "songLinks[{}] of anime {} is not a list, skipping",
                        song_type, self.ann_id
                    );
                    continue;
                }
            };
            for item in items {
                match serde_json::from_value::<SongLinkRecord>(item.clone()) {
                    Ok(link) => links.push(link),
                    Err(e) => {
                        warn!("Skipping malformed song link of anime {}: {}", self.ann_id, e);
                    }
                }
            }
        }
        links
    }
}
