use std::collections::{HashMap, HashSet};

use log::debug;
use serde::Serialize;

use super::allocation::AllocationPlan;
use super::config::ArtistCapConfig;
use super::scoring::ScoredCandidate;
use crate::models::Track;

/// Global per-artist ceilings for one playlist type
#[derive(Debug, Clone)]
pub struct ArtistCaps {
    base: usize,
    dominant_artists: Vec<String>,
    dominant_cap: Option<usize>,
}

impl ArtistCaps {
    pub fn new(base: usize) -> Self {
        Self {
            base,
            dominant_artists: Vec::new(),
            dominant_cap: None,
        }
    }

    pub fn from_config(config: &ArtistCapConfig, playlist_type: Option<&str>) -> Self {
        let mut caps = Self::new(config.cap_for(playlist_type));
        if let Some(dominant) = &config.dominant {
            caps.dominant_artists = dominant.artists.clone();
            caps.dominant_cap = Some(dominant.cap.max(0) as usize);
        }
        caps
    }

    pub fn base(&self) -> usize {
        self.base
    }

    /// Cap for the track's primary artist, honouring the dominant-artist override
    pub fn cap_for(&self, track: &Track) -> usize {
        match (self.dominant_cap, track.primary_artist()) {
            (Some(cap), Some(artist))
                if self
                    .dominant_artists
                    .iter()
                    .any(|reference| artist.matches(reference)) =>
            {
                cap
            }
            _ => self.base,
        }
    }
}

/// One admitted track with its provenance
#[derive(Debug, Clone, Serialize)]
pub struct SelectedTrack {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub uri: Option<String>,
    pub bucket: String,
    pub score: f64,
    /// 1-based position in the bucket's ranking
    pub rank_in_bucket: usize,
    pub source: String,
    /// Admitted on slots carried over from another bucket
    pub reallocated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BucketOutcome {
    pub bucket: String,
    pub quota: usize,
    pub carried_in: usize,
    pub filled: usize,
    pub rejected_by_artist_cap: usize,
    pub duplicates_skipped: usize,
    pub carried_out: usize,
}

/// Ordered selection plus shortfall bookkeeping
#[derive(Debug, Clone, Serialize)]
pub struct SelectionResult {
    /// Admission order. Tracks taken on wrap-around slots follow the last bucket,
    /// so a bucket's tracks are not necessarily contiguous.
    pub tracks: Vec<SelectedTrack>,
    pub requested_size: usize,
    pub shortfall: bool,
    pub shortfall_count: usize,
    pub buckets: Vec<BucketOutcome>,
}

impl SelectionResult {
    pub fn track_ids(&self) -> Vec<String> {
        self.tracks.iter().map(|track| track.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn bucket_distribution(&self) -> Vec<(String, usize)> {
        self.buckets
            .iter()
            .map(|outcome| {
                let count = self.tracks.iter().filter(|t| t.bucket == outcome.bucket).count();
                (outcome.bucket.clone(), count)
            })
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    pub fn unique_artists(&self) -> usize {
        self.tracks
            .iter()
            .map(|track| track.artist.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Greedy quota filler
pub struct SelectionEngine<'a> {
    caps: &'a ArtistCaps,
}

struct SelectionState {
    selected: Vec<SelectedTrack>,
    selected_ids: HashSet<String>,
    artist_counts: HashMap<String, usize>,
    limit: usize,
}

impl<'a> SelectionEngine<'a> {
    pub fn new(caps: &'a ArtistCaps) -> Self {
        Self { caps }
    }

    /// Fill each bucket's quota in plan order from its ranked candidates.
    /// Unfilled slots carry to the next bucket; leftovers after the last bucket
    /// get one more pass over all buckets in the same order.
    pub fn select(
        &self,
        ranked: &HashMap<String, Vec<ScoredCandidate>>,
        plan: &AllocationPlan,
    ) -> SelectionResult {
        let mut state = SelectionState {
            selected: Vec::with_capacity(plan.requested_size),
            selected_ids: HashSet::new(),
            artist_counts: HashMap::new(),
            limit: plan.requested_size,
        };
        let empty = Vec::new();
        let mut cursors = vec![0usize; plan.quotas.len()];
        let mut outcomes = Vec::with_capacity(plan.quotas.len());
        let mut carry = 0usize;

        for (index, entry) in plan.quotas.iter().enumerate() {
            let candidates = ranked.get(&entry.bucket).unwrap_or(&empty);
            let room = state.limit - state.selected.len();
            let budget = (entry.quota + carry).min(room);
            let mut outcome = BucketOutcome {
                bucket: entry.bucket.clone(),
                quota: entry.quota,
                carried_in: carry,
                ..BucketOutcome::default()
            };

            let filled = self.fill(
                &mut state,
                candidates,
                &mut cursors[index],
                budget,
                entry.quota,
                &mut outcome,
            );
            carry = budget - filled;
            outcome.filled = filled;
            outcome.carried_out = carry;

            if carry > 0 {
                debug!(
                    "Bucket '{}' filled {}/{} slots; carrying {} forward",
                    entry.bucket, filled, budget, carry
                );
            }
            outcomes.push(outcome);
        }

        // wrap-around pass for slots the last buckets could not use
        for (index, entry) in plan.quotas.iter().enumerate() {
            if carry == 0 || state.selected.len() >= state.limit {
                break;
            }
            let candidates = ranked.get(&entry.bucket).unwrap_or(&empty);
            let budget = carry.min(state.limit - state.selected.len());
            let filled = self.fill(
                &mut state,
                candidates,
                &mut cursors[index],
                budget,
                0,
                &mut outcomes[index],
            );
            if filled > 0 {
                debug!("Bucket '{}' absorbed {} carried slots", entry.bucket, filled);
            }
            outcomes[index].filled += filled;
            carry -= filled;
        }

        let shortfall_count = state.limit.saturating_sub(state.selected.len());
        SelectionResult {
            tracks: state.selected,
            requested_size: plan.requested_size,
            shortfall: shortfall_count > 0,
            shortfall_count,
            buckets: outcomes,
        }
    }

    /// Admit up to `budget` candidates starting at `cursor`; admissions beyond
    /// `own_quota` are marked as reallocated
    fn fill(
        &self,
        state: &mut SelectionState,
        candidates: &[ScoredCandidate],
        cursor: &mut usize,
        budget: usize,
        own_quota: usize,
        outcome: &mut BucketOutcome,
    ) -> usize {
        let mut admitted = 0;
        while admitted < budget && *cursor < candidates.len() {
            let candidate = &candidates[*cursor];
            let rank_in_bucket = *cursor + 1;
            *cursor += 1;

            if state.selected_ids.contains(candidate.id()) {
                outcome.duplicates_skipped += 1;
                continue;
            }

            let track = candidate.track();
            let artist_key = track.primary_artist_key();
            let artist_count = state.artist_counts.get(&artist_key).copied().unwrap_or(0);
            if artist_count >= self.caps.cap_for(track) {
                outcome.rejected_by_artist_cap += 1;
                continue;
            }

            *state.artist_counts.entry(artist_key).or_insert(0) += 1;
            state.selected_ids.insert(candidate.id().to_string());
            state.selected.push(SelectedTrack {
                id: candidate.id().to_string(),
                title: track.title.clone(),
                artist: track.artist_display(),
                uri: track.uri.clone(),
                bucket: candidate.bucket.clone(),
                score: candidate.score,
                rank_in_bucket,
                source: candidate.candidate.source.clone(),
                reallocated: outcome.filled + admitted >= own_quota,
            });
            admitted += 1;
        }
        admitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Artist;
    use crate::playlist::aggregator::Candidate;
    use crate::playlist::allocation::BucketQuota;
    use crate::playlist::config::DominantArtists;
    use crate::playlist::scoring::SubScores;

    fn scored(id: &str, artist: &str, bucket: &str, score: f64) -> ScoredCandidate {
        ScoredCandidate {
            candidate: Candidate {
                id: id.to_string(),
                source: "test".to_string(),
                track: Track {
                    id: Some(id.to_string()),
                    title: format!("Song {id}"),
                    artists: vec![Artist { id: None, name: artist.to_string() }],
                    ..Track::default()
                },
            },
            bucket: bucket.to_string(),
            sub_scores: SubScores {
                popularity: score,
                popularity_delta: 0.5,
                recency: 0.0,
                audio_feature_fit: 0.5,
            },
            score,
        }
    }

    fn plan(size: usize, quotas: &[(&str, usize)]) -> AllocationPlan {
        AllocationPlan {
            requested_size: size,
            target_size: quotas.iter().map(|(_, q)| q).sum(),
            floor_quota: 0,
            quotas: quotas
                .iter()
                .map(|(bucket, quota)| BucketQuota {
                    bucket: bucket.to_string(),
                    quota: *quota,
                    eligible: *quota,
                    guaranteed: 0,
                })
                .collect(),
        }
    }

    fn ids(result: &SelectionResult) -> Vec<&str> {
        result.tracks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_fills_in_bucket_then_rank_order() {
        let ranked = HashMap::from([
            ("Pop".to_string(), vec![scored("p1", "A", "Pop", 0.9), scored("p2", "B", "Pop", 0.8), scored("p3", "C", "Pop", 0.7)]),
            ("Rock".to_string(), vec![scored("r1", "D", "Rock", 0.95), scored("r2", "E", "Rock", 0.6)]),
        ]);
        let caps = ArtistCaps::new(5);
        let result = SelectionEngine::new(&caps).select(&ranked, &plan(4, &[("Pop", 2), ("Rock", 2)]));

        assert_eq!(ids(&result), vec!["p1", "p2", "r1", "r2"]);
        assert!(!result.shortfall);
        assert_eq!(result.tracks[2].rank_in_bucket, 1);
        assert!(result.tracks.iter().all(|t| !t.reallocated));
    }

    #[test]
    fn test_artist_cap_is_global() {
        let ranked = HashMap::from([
            ("Pop".to_string(), vec![scored("p1", "X", "Pop", 0.9), scored("p2", "Y", "Pop", 0.8)]),
            ("Rock".to_string(), vec![scored("r1", "X", "Rock", 0.95), scored("r2", "Z", "Rock", 0.6)]),
        ]);
        let caps = ArtistCaps::new(1);
        let result = SelectionEngine::new(&caps).select(&ranked, &plan(4, &[("Pop", 2), ("Rock", 2)]));

        assert_eq!(ids(&result), vec!["p1", "p2", "r2"]);
        assert_eq!(result.buckets[1].rejected_by_artist_cap, 1);
        assert!(result.shortfall);
        assert_eq!(result.shortfall_count, 1);
    }

    #[test]
    fn test_unfilled_quota_carries_to_next_bucket() {
        let ranked = HashMap::from([
            ("Pop".to_string(), vec![scored("p1", "X", "Pop", 0.9), scored("p2", "X", "Pop", 0.85), scored("p3", "X", "Pop", 0.8)]),
            ("Rock".to_string(), vec![scored("r1", "A", "Rock", 0.5), scored("r2", "B", "Rock", 0.4), scored("r3", "C", "Rock", 0.3)]),
        ]);
        let caps = ArtistCaps::new(1);
        let result = SelectionEngine::new(&caps).select(&ranked, &plan(4, &[("Pop", 3), ("Rock", 1)]));

        assert_eq!(ids(&result), vec!["p1", "r1", "r2", "r3"]);
        assert_eq!(result.buckets[0].carried_out, 2);
        assert_eq!(result.buckets[1].carried_in, 2);
        assert_eq!(result.buckets[1].filled, 3);
        assert!(!result.tracks[1].reallocated);
        assert!(result.tracks[2].reallocated);
        assert!(result.tracks[3].reallocated);
        assert!(!result.shortfall);
    }

    #[test]
    fn test_wrap_around_pass_uses_earlier_buckets() {
        let ranked = HashMap::from([
            ("Pop".to_string(), vec![scored("p1", "A", "Pop", 0.9), scored("p2", "B", "Pop", 0.8), scored("p3", "C", "Pop", 0.7)]),
            ("Rock".to_string(), vec![scored("r1", "X", "Rock", 0.9), scored("r2", "X", "Rock", 0.8)]),
        ]);
        let caps = ArtistCaps::new(1);
        let result = SelectionEngine::new(&caps).select(&ranked, &plan(4, &[("Pop", 2), ("Rock", 2)]));

        assert_eq!(ids(&result), vec!["p1", "p2", "r1", "p3"]);
        let buckets: Vec<&str> = result.tracks.iter().map(|t| t.bucket.as_str()).collect();
        assert_eq!(buckets, vec!["Pop", "Pop", "Rock", "Pop"]);
        assert!(result.tracks[3].reallocated);
        assert_eq!(result.buckets[0].filled, 3);
        assert!(!result.shortfall);
    }

    #[test]
    fn test_duplicate_ids_across_buckets_are_skipped() {
        let ranked = HashMap::from([
            ("Pop".to_string(), vec![scored("same", "A", "Pop", 0.9)]),
            ("Rock".to_string(), vec![scored("same", "A", "Rock", 0.9), scored("r2", "B", "Rock", 0.5)]),
        ]);
        let caps = ArtistCaps::new(5);
        let result = SelectionEngine::new(&caps).select(&ranked, &plan(2, &[("Pop", 1), ("Rock", 1)]));

        assert_eq!(ids(&result), vec!["same", "r2"]);
        assert_eq!(result.buckets[1].duplicates_skipped, 1);
    }

    #[test]
    fn test_dominant_artist_override() {
        let config = ArtistCapConfig {
            default: Some(1),
            dominant: Some(DominantArtists {
                artists: vec!["big star".to_string()],
                cap: 3,
            }),
            per_type: Default::default(),
        };
        let caps = ArtistCaps::from_config(&config, None);
        let ranked = HashMap::from([(
            "Pop".to_string(),
            vec![
                scored("s1", "Big Star", "Pop", 0.9),
                scored("s2", "Big Star", "Pop", 0.8),
                scored("s3", "Big Star", "Pop", 0.7),
                scored("s4", "Big Star", "Pop", 0.6),
                scored("o1", "Other Act", "Pop", 0.5),
                scored("o2", "Other Act", "Pop", 0.4),
            ],
        )]);
        let result = SelectionEngine::new(&caps).select(&ranked, &plan(6, &[("Pop", 6)]));

        assert_eq!(ids(&result), vec!["s1", "s2", "s3", "o1"]);
        assert_eq!(result.shortfall_count, 2);
    }

    #[test]
    fn test_missing_bucket_is_empty() {
        let caps = ArtistCaps::new(2);
        let result = SelectionEngine::new(&caps).select(&HashMap::new(), &plan(3, &[("Jazz", 3)]));
        assert!(result.is_empty());
        assert!(result.shortfall);
        assert_eq!(result.shortfall_count, 3);
    }
}
