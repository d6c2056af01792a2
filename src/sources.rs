//! Seams to the outside world: discovery sources that report candidate tracks
//! and the store that knows what a playlist currently holds.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::models::Track;
use crate::playlist::{CuratorConfig, CurationOutcome, PlaylistGenerator, RunContext, SourceBatch};

/// A discovery source ("new releases", "trending", an editorial playlist, ...)
#[cfg_attr(test, mockall::automock)]
pub trait CandidateSource {
    fn source_name(&self) -> String;

    fn fetch_tracks(&self) -> Result<Vec<Track>>;
}

/// Read access to the managed playlists' current state
#[cfg_attr(test, mockall::automock)]
pub trait PlaylistStore {
    /// Track ids currently in the playlist of this type, in playlist order
    fn current_track_ids(&self, playlist_type: &str) -> Result<Vec<String>>;

    /// Popularity recorded for each track on the previous run
    fn previous_popularity(&self, playlist_type: &str) -> Result<HashMap<String, u8>>;
}

/// Source backed by a JSON file holding an array of tracks
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    name: String,
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Parse a `name=path` command-line argument; a bare path is named after its file stem
    pub fn from_arg(arg: &str) -> Self {
        match arg.split_once('=') {
            Some((name, path)) if !name.trim().is_empty() => Self::new(name.trim(), path.trim()),
            _ => {
                let path = PathBuf::from(arg.trim());
                let name = path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| arg.to_string());
                Self::new(name, path)
            }
        }
    }
}

impl CandidateSource for JsonFileSource {
    fn source_name(&self) -> String {
        self.name.clone()
    }

    fn fetch_tracks(&self) -> Result<Vec<Track>> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read source file '{}'", self.path.display()))?;
        let records: Vec<serde_json::Value> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse tracks in '{}'", self.path.display()))?;

        let mut tracks = Vec::with_capacity(records.len());
        let mut malformed = 0usize;
        for (index, record) in records.into_iter().enumerate() {
            match serde_json::from_value::<Track>(record) {
                Ok(track) => tracks.push(track),
                Err(e) => {
                    debug!("Skipping record {} in '{}': {}", index, self.path.display(), e);
                    malformed += 1;
                }
            }
        }
        if malformed > 0 {
            warn!(
                "Source '{}' had {} malformed track records; kept {}",
                self.name,
                malformed,
                tracks.len()
            );
        }
        Ok(tracks)
    }
}

/// Saved state of one playlist: `{"tracks": [...], "popularity": {...}}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaylistSnapshot {
    #[serde(default)]
    pub tracks: Vec<String>,
    #[serde(default)]
    pub popularity: HashMap<String, u8>,
}

/// Store backed by a single snapshot file; the playlist type is not consulted
#[derive(Debug, Clone)]
pub struct JsonPlaylistStore {
    path: PathBuf,
}

impl JsonPlaylistStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<PlaylistSnapshot> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read playlist state '{}'", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse playlist state '{}'", self.path.display()))
    }
}

impl PlaylistStore for JsonPlaylistStore {
    fn current_track_ids(&self, _playlist_type: &str) -> Result<Vec<String>> {
        Ok(self.load()?.tracks)
    }

    fn previous_popularity(&self, _playlist_type: &str) -> Result<HashMap<String, u8>> {
        Ok(self.load()?.popularity)
    }
}

/// Store for a playlist that does not exist yet
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyPlaylistStore;

impl PlaylistStore for EmptyPlaylistStore {
    fn current_track_ids(&self, _playlist_type: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn previous_popularity(&self, _playlist_type: &str) -> Result<HashMap<String, u8>> {
        Ok(HashMap::new())
    }
}

/// Run one curation: validate the configuration, gather candidates from every
/// source, read the playlist's current state and compute the outcome.
///
/// Configuration errors abort before any source is queried. A failing source is
/// logged and recorded in the report; the run continues with the others.
pub fn curate(
    config: CuratorConfig,
    playlist_type: Option<&str>,
    sources: &[&dyn CandidateSource],
    store: &dyn PlaylistStore,
    as_of: NaiveDate,
) -> Result<CurationOutcome> {
    let generator = PlaylistGenerator::new(config, playlist_type).context("Invalid curator configuration")?;
    let state_key = generator.playlist_type().unwrap_or("default").to_string();

    let mut batches = Vec::with_capacity(sources.len());
    let mut failed_sources = Vec::new();
    for source in sources {
        let name = source.source_name();
        match source.fetch_tracks() {
            Ok(tracks) => {
                info!("Source '{}' reported {} tracks", name, tracks.len());
                batches.push(SourceBatch { source: name, tracks });
            }
            Err(e) => {
                warn!("Source '{name}' failed, continuing without it: {e:#}");
                failed_sources.push(name);
            }
        }
    }

    let current = store
        .current_track_ids(&state_key)
        .context("Failed to read current playlist tracks")?;
    let previous = store
        .previous_popularity(&state_key)
        .context("Failed to read previous popularity")?;

    let context = RunContext::new(as_of, &current).with_previous_popularity(&previous);
    let mut outcome = generator.generate(batches, &context);
    outcome.report.failed_sources = failed_sources;
    Ok(outcome)
}
