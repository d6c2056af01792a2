use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use log::{debug, info, warn};

use super::aggregator::{CandidateAggregator, SourceBatch};
use super::allocation::{AllocationPlanner, BucketDemand};
use super::classifier::{Classification, GenreClassifier};
use super::config::{CuratorConfig, OTHER_BUCKET, ScoringWeights};
use super::diff::SnapshotDiff;
use super::filters::{FilterRejection, TrackFilters};
use super::metadata::{CurationOutcome, DataQualityReport};
use super::scoring::{ScoredCandidate, ScoringEngine};
use super::selection::{ArtistCaps, SelectionEngine};
use crate::error::ConfigResult;

/// Per-run inputs that are not configuration
#[derive(Debug, Clone)]
pub struct RunContext<'a> {
    /// Reference date for recency scoring
    pub as_of: NaiveDate,
    /// Track ids currently in the external playlist, in playlist order
    pub current_track_ids: &'a [String],
    /// Popularity observed on the previous run, used when a track carries no delta
    pub previous_popularity: Option<&'a HashMap<String, u8>>,
}

impl<'a> RunContext<'a> {
    pub fn new(as_of: NaiveDate, current_track_ids: &'a [String]) -> Self {
        Self {
            as_of,
            current_track_ids,
            previous_popularity: None,
        }
    }

    pub fn with_previous_popularity(mut self, previous: &'a HashMap<String, u8>) -> Self {
        self.previous_popularity = Some(previous);
        self
    }
}

/// Runs aggregation, classification, scoring, allocation, selection and diffing
/// for one playlist type under one validated configuration
#[derive(Debug, Clone)]
pub struct PlaylistGenerator {
    config: CuratorConfig,
    playlist_type: Option<String>,
    weights: ScoringWeights,
    classifier: GenreClassifier,
    caps: ArtistCaps,
}

impl PlaylistGenerator {
    /// Validate the configuration and prepare lookup tables. `playlist_type`
    /// overrides `playlist.type` from the configuration.
    pub fn new(config: CuratorConfig, playlist_type: Option<&str>) -> ConfigResult<Self> {
        config.validate()?;

        let playlist_type = playlist_type
            .map(str::to_string)
            .or_else(|| config.playlist.playlist_type.clone());
        let weights = config.scoring.weights_for(playlist_type.as_deref());
        let classifier = GenreClassifier::new(&config.genres);
        let caps = ArtistCaps::from_config(&config.artist_caps, playlist_type.as_deref());

        Ok(Self {
            config,
            playlist_type,
            weights,
            classifier,
            caps,
        })
    }

    pub fn config(&self) -> &CuratorConfig {
        &self.config
    }

    pub fn playlist_type(&self) -> Option<&str> {
        self.playlist_type.as_deref()
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn artist_cap(&self) -> usize {
        self.caps.base()
    }

    /// Produce the selection and change summary for one run
    pub fn generate(&self, batches: Vec<SourceBatch>, context: &RunContext) -> CurationOutcome {
        let mut report = DataQualityReport::default();
        let size = self.config.playlist.size;

        let pool = CandidateAggregator::aggregate(batches);
        report.skipped_missing_id = pool.skipped_missing_id;
        report.duplicate_ids = pool.duplicates_dropped;
        info!(
            "Aggregated {} unique candidates ({} without id, {} duplicates)",
            pool.candidates.len(),
            pool.skipped_missing_id,
            pool.duplicates_dropped
        );

        let current_ids: HashSet<&str> = context.current_track_ids.iter().map(String::as_str).collect();
        let engine = ScoringEngine::new(&self.config.scoring, self.weights, context.as_of);
        let mut ranked: HashMap<String, Vec<ScoredCandidate>> = HashMap::new();
        let mut eligible = 0usize;

        for candidate in pool.candidates {
            let track = &candidate.track;
            match TrackFilters::check(&candidate.id, track, &self.config.filters, &current_ids) {
                Ok(()) => {}
                Err(FilterRejection::BelowMinPopularity) => {
                    report.below_min_popularity += 1;
                    continue;
                }
                Err(FilterRejection::Explicit) => {
                    report.explicit_filtered += 1;
                    continue;
                }
                Err(FilterRejection::AlreadyInPlaylist) => {
                    report.already_in_playlist += 1;
                    continue;
                }
            }

            let bucket = match self.classifier.classify(&track.normalized_genres()) {
                Classification::Matched(name) => name.to_string(),
                Classification::Other => {
                    debug!("Track '{}' ({}) matched no genre bucket", track.title, candidate.id);
                    report.unmapped_genre += 1;
                    OTHER_BUCKET.to_string()
                }
                Classification::Excluded => {
                    report.excluded_unmapped += 1;
                    continue;
                }
            };

            if !track.has_audio_features() {
                report.missing_audio_features += 1;
            }
            if track.parsed_release_date().is_none() {
                report.missing_release_date += 1;
            }

            let delta = self.resolve_delta(&candidate.id, track.popularity, track.popularity_delta, context);
            let scored = engine.score(candidate, bucket, delta);
            ranked.entry(scored.bucket.clone()).or_default().push(scored);
            eligible += 1;
        }

        for candidates in ranked.values_mut() {
            ScoringEngine::rank(candidates);
        }

        if report.unmapped_genre > 0 {
            warn!("{} tracks matched no genre bucket and were pooled as Other", report.unmapped_genre);
        }
        if report.missing_audio_features > 0 {
            warn!(
                "{} tracks have no usable audio features; scored with the neutral fit",
                report.missing_audio_features
            );
        }

        let top_k = self.config.allocation.mass_top_k.unwrap_or(size).max(1);
        let demands: Vec<BucketDemand> = self
            .config
            .genres
            .bucket_order()
            .into_iter()
            .map(|name| {
                let scores: Vec<f64> = ranked
                    .get(&name)
                    .map(|candidates| candidates.iter().map(|c| c.score).collect())
                    .unwrap_or_default();
                BucketDemand {
                    mass: AllocationPlanner::bucket_mass(&scores, top_k),
                    eligible: scores.len(),
                    cap: self.config.allocation.bucket_caps.get(&name).copied(),
                    name,
                }
            })
            .collect();

        let plan = AllocationPlanner::plan(&demands, size, self.config.floor_quota());
        for quota in &plan.quotas {
            debug!(
                "Bucket '{}': {} eligible, quota {} (guaranteed {})",
                quota.bucket, quota.eligible, quota.quota, quota.guaranteed
            );
        }

        let selection = SelectionEngine::new(&self.caps).select(&ranked, &plan);
        if selection.shortfall {
            warn!(
                "Selected {} of {} requested tracks (shortfall {})",
                selection.len(),
                size,
                selection.shortfall_count
            );
        } else {
            info!("Selected {} tracks", selection.len());
        }

        let desired = SnapshotDiff::desired_tracks(
            &selection.track_ids(),
            context.current_track_ids,
            self.config.playlist.update_mode,
            self.config.playlist.max_size,
        );
        let diff = SnapshotDiff::compare(&desired, context.current_track_ids, self.config.playlist.order_tolerance);
        info!(
            "Diff: +{} -{} ={} (update needed: {})",
            diff.added.len(),
            diff.removed.len(),
            diff.unchanged,
            diff.update_needed
        );

        CurationOutcome {
            playlist_type: self.playlist_type.clone(),
            eligible_candidates: eligible,
            plan,
            selection,
            diff,
            report,
        }
    }

    /// The track's own delta, else the change since the previous observation
    fn resolve_delta(&self, id: &str, popularity: u8, delta: Option<i32>, context: &RunContext) -> Option<i32> {
        delta.or_else(|| {
            context
                .previous_popularity
                .and_then(|previous| previous.get(id))
                .map(|previous| i32::from(popularity) - i32::from(*previous))
        })
    }
}
