use std::collections::HashSet;

use super::config::FilterSettings;
use crate::models::Track;

/// Why a candidate was left out of the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterRejection {
    BelowMinPopularity,
    Explicit,
    AlreadyInPlaylist,
}

/// Track filtering functionality using static helper functions
pub struct TrackFilters;

impl TrackFilters {
    /// Check if a track reaches the configured popularity floor
    pub fn meets_min_popularity(track: &Track, settings: &FilterSettings) -> bool {
        track.popularity >= settings.min_popularity
    }

    /// Check if a track passes the explicit-content setting
    pub fn passes_explicit_filter(track: &Track, settings: &FilterSettings) -> bool {
        settings.allow_explicit || !track.explicit
    }

    /// Check if a track is absent from the playlist's current contents
    pub fn not_in_current_playlist(id: &str, current_ids: &HashSet<&str>) -> bool {
        !current_ids.contains(id)
    }

    /// Apply all filters; the first failing filter is reported
    pub fn check(
        id: &str,
        track: &Track,
        settings: &FilterSettings,
        current_ids: &HashSet<&str>,
    ) -> Result<(), FilterRejection> {
        if !Self::meets_min_popularity(track, settings) {
            return Err(FilterRejection::BelowMinPopularity);
        }
        if !Self::passes_explicit_filter(track, settings) {
            return Err(FilterRejection::Explicit);
        }
        if settings.exclude_current_tracks && !Self::not_in_current_playlist(id, current_ids) {
            return Err(FilterRejection::AlreadyInPlaylist);
        }
        Ok(())
    }
}
