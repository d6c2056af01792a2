use serde::Serialize;

use super::allocation::AllocationPlan;
use super::diff::PlaylistDiff;
use super::selection::SelectionResult;

/// Counters for recoverable data problems met during one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataQualityReport {
    pub skipped_missing_id: usize,
    pub duplicate_ids: usize,
    pub below_min_popularity: usize,
    pub explicit_filtered: usize,
    pub already_in_playlist: usize,
    /// Tracks pooled in the reserved bucket because no tag matched
    pub unmapped_genre: usize,
    /// Unmatched tracks dropped because the reserved bucket is excluded
    pub excluded_unmapped: usize,
    pub missing_audio_features: usize,
    pub missing_release_date: usize,
    pub failed_sources: Vec<String>,
}

impl DataQualityReport {
    pub fn has_warnings(&self) -> bool {
        *self != DataQualityReport::default()
    }
}

/// Everything one curation run produces
#[derive(Debug, Clone, Serialize)]
pub struct CurationOutcome {
    pub playlist_type: Option<String>,
    pub eligible_candidates: usize,
    pub plan: AllocationPlan,
    pub selection: SelectionResult,
    pub diff: PlaylistDiff,
    pub report: DataQualityReport,
}

impl CurationOutcome {
    pub fn track_ids(&self) -> Vec<String> {
        self.selection.track_ids()
    }
}
