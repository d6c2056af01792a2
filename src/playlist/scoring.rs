use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::Serialize;

use super::aggregator::Candidate;
use super::config::{RecencyDecay, RecencySettings, ScoringConfig, ScoringWeights};
use crate::models::{AudioFeatures, Track};

/// Sub-score used whenever a signal is unknown
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Normalized sub-scores, each in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubScores {
    pub popularity: f64,
    pub popularity_delta: f64,
    pub recency: f64,
    pub audio_feature_fit: f64,
}

/// A candidate with its bucket, sub-scores and composite score
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub bucket: String,
    pub sub_scores: SubScores,
    pub score: f64,
}

impl ScoredCandidate {
    pub fn id(&self) -> &str {
        &self.candidate.id
    }

    pub fn track(&self) -> &Track {
        &self.candidate.track
    }
}

/// Computes weighted composite scores relative to a fixed reference date
#[derive(Debug, Clone)]
pub struct ScoringEngine<'a> {
    config: &'a ScoringConfig,
    weights: ScoringWeights,
    as_of: NaiveDate,
}

impl<'a> ScoringEngine<'a> {
    pub fn new(config: &'a ScoringConfig, weights: ScoringWeights, as_of: NaiveDate) -> Self {
        Self {
            config,
            weights,
            as_of,
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Popularity 0–100 mapped onto 0.0–1.0
    pub fn popularity_score(popularity: u8) -> f64 {
        (f64::from(popularity) / 100.0).min(1.0)
    }

    /// Signed popularity swing mapped onto 0.0–1.0, saturating at ±`delta_max`
    pub fn popularity_delta_score(delta: Option<i32>, delta_max: f64) -> f64 {
        match delta {
            Some(delta) => ((f64::from(delta) + delta_max) / (2.0 * delta_max)).clamp(0.0, 1.0),
            None => NEUTRAL_SCORE,
        }
    }

    /// 1.0 on release day, 0.0 at and past the horizon, monotonically decreasing between
    pub fn recency_score(
        release_date: Option<NaiveDate>,
        as_of: NaiveDate,
        settings: &RecencySettings,
    ) -> f64 {
        let Some(release_date) = release_date else {
            return 0.0;
        };

        let days_old = as_of.signed_duration_since(release_date).num_days().max(0) as f64;
        let horizon = f64::from(settings.horizon_days);
        if days_old >= horizon {
            return 0.0;
        }

        match settings.decay {
            RecencyDecay::Linear => 1.0 - days_old / horizon,
            RecencyDecay::Exponential { half_life_days } => {
                (-std::f64::consts::LN_2 * days_old / half_life_days).exp()
            }
        }
    }

    /// One minus the RMS distance over the features present in both vectors.
    /// Missing features on either side give the neutral score.
    pub fn audio_fit_score(features: Option<&AudioFeatures>, target: &AudioFeatures) -> f64 {
        let Some(features) = features else {
            return NEUTRAL_SCORE;
        };

        let (squared_sum, dimensions) = features
            .dimensions()
            .iter()
            .zip(target.dimensions().iter())
            .filter_map(|pair| match pair {
                (Some(value), Some(wanted)) => {
                    Some(value.clamp(0.0, 1.0) - wanted.clamp(0.0, 1.0))
                }
                _ => None,
            })
            .fold((0.0, 0usize), |(sum, count), diff| (sum + diff * diff, count + 1));

        if dimensions == 0 {
            return NEUTRAL_SCORE;
        }

        let distance = (squared_sum / dimensions as f64).sqrt();
        (1.0 - distance).clamp(0.0, 1.0)
    }

    /// Compute every sub-score for a track; `delta` is the resolved popularity delta
    pub fn sub_scores(&self, track: &Track, delta: Option<i32>) -> SubScores {
        SubScores {
            popularity: Self::popularity_score(track.popularity),
            popularity_delta: Self::popularity_delta_score(delta, self.config.delta_max),
            recency: Self::recency_score(
                track.parsed_release_date(),
                self.as_of,
                &self.config.recency,
            ),
            audio_feature_fit: Self::audio_fit_score(
                track.audio_features.as_ref(),
                &self.config.target_profile,
            ),
        }
    }

    pub fn composite(&self, sub_scores: &SubScores) -> f64 {
        self.weights.popularity * sub_scores.popularity
            + self.weights.popularity_delta * sub_scores.popularity_delta
            + self.weights.recency_boost * sub_scores.recency
            + self.weights.audio_feature_fit * sub_scores.audio_feature_fit
    }

    /// Score a classified candidate
    pub fn score(&self, candidate: Candidate, bucket: String, delta: Option<i32>) -> ScoredCandidate {
        let sub_scores = self.sub_scores(&candidate.track, delta);
        let score = self.composite(&sub_scores);
        ScoredCandidate {
            candidate,
            bucket,
            sub_scores,
            score,
        }
    }

    /// Ranking order: score descending, then catalog id ascending
    pub fn compare(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.candidate.id.cmp(&b.candidate.id))
    }

    pub fn rank(candidates: &mut [ScoredCandidate]) {
        candidates.sort_by(Self::compare);
    }
}
