use std::collections::HashSet;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::models::Track;

/// Tracks reported by one discovery source ("new releases", "trending", ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceBatch {
    pub source: String,
    pub tracks: Vec<Track>,
}

/// A track admitted to the pool, with its resolved id and first reporting source
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: String,
    pub source: String,
    pub track: Track,
}

/// Deduplicated candidate pool in first-observation order
#[derive(Debug, Clone, Default)]
pub struct AggregatedPool {
    pub candidates: Vec<Candidate>,
    pub skipped_missing_id: usize,
    pub duplicates_dropped: usize,
}

/// Merges multi-source batches into one pool keyed by catalog id
pub struct CandidateAggregator;

impl CandidateAggregator {
    /// First observation of an id wins; source order only decides provenance
    pub fn aggregate(batches: Vec<SourceBatch>) -> AggregatedPool {
        let mut pool = AggregatedPool::default();
        let mut seen_ids = HashSet::new();

        for batch in batches {
            let batch_size = batch.tracks.len();
            let before = pool.candidates.len();

            for track in batch.tracks {
                let Some(id) = track.catalog_id().map(str::to_string) else {
                    warn!(
                        "Skipping track '{}' from source '{}': missing catalog id",
                        track.title, batch.source
                    );
                    pool.skipped_missing_id += 1;
                    continue;
                };

                if !seen_ids.insert(id.clone()) {
                    pool.duplicates_dropped += 1;
                    continue;
                }

                pool.candidates.push(Candidate {
                    id,
                    source: batch.source.clone(),
                    track,
                });
            }

            debug!(
                "Source '{}': {} tracks, {} new candidates",
                batch.source,
                batch_size,
                pool.candidates.len() - before
            );
        }

        if pool.duplicates_dropped > 0 {
            debug!("Dropped {} duplicate candidate ids", pool.duplicates_dropped);
        }
        pool
    }
}
