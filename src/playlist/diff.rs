use std::collections::HashSet;

use serde::Serialize;

use super::config::UpdateMode;

/// Change summary between the desired track list and the playlist's current one
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: usize,
    /// Common tracks whose relative position differs
    pub displaced: usize,
    pub update_needed: bool,
    /// The list the playlist should hold if the update is applied
    pub desired: Vec<String>,
}

impl PlaylistDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Decides whether a playlist needs updating; never touches external state
pub struct SnapshotDiff;

impl SnapshotDiff {
    /// Track list the playlist should hold after this run.
    /// `Accumulate` keeps current tracks and appends new ones, trimming the oldest
    /// from the front once `max_size` is exceeded.
    pub fn desired_tracks(
        selected: &[String],
        current: &[String],
        mode: UpdateMode,
        max_size: Option<usize>,
    ) -> Vec<String> {
        match mode {
            UpdateMode::Replace => dedup_preserving_order(selected),
            UpdateMode::Accumulate => {
                let mut desired = dedup_preserving_order(current);
                let present: HashSet<String> = desired.iter().cloned().collect();
                desired.extend(
                    dedup_preserving_order(selected)
                        .into_iter()
                        .filter(|id| !present.contains(id)),
                );
                if let Some(max_size) = max_size {
                    let excess = desired.len().saturating_sub(max_size);
                    desired.drain(..excess);
                }
                desired
            }
        }
    }

    /// Compare `desired` against `current`. With `order_tolerance = None` order is
    /// ignored; `Some(n)` flags an update once more than `n` common tracks moved.
    pub fn compare(desired: &[String], current: &[String], order_tolerance: Option<usize>) -> PlaylistDiff {
        let desired = dedup_preserving_order(desired);
        let current = dedup_preserving_order(current);

        let desired_set: HashSet<&str> = desired.iter().map(String::as_str).collect();
        let current_set: HashSet<&str> = current.iter().map(String::as_str).collect();

        let added: Vec<String> = desired
            .iter()
            .filter(|id| !current_set.contains(id.as_str()))
            .cloned()
            .collect();
        let removed: Vec<String> = current
            .iter()
            .filter(|id| !desired_set.contains(id.as_str()))
            .cloned()
            .collect();

        let common_new = desired.iter().filter(|id| current_set.contains(id.as_str()));
        let common_old = current.iter().filter(|id| desired_set.contains(id.as_str()));
        let displaced = common_new.zip(common_old).filter(|(a, b)| a != b).count();
        let unchanged = desired.len() - added.len();

        let reordered = order_tolerance.is_some_and(|tolerance| displaced > tolerance);
        let update_needed = !added.is_empty() || !removed.is_empty() || reordered;

        PlaylistDiff {
            added,
            removed,
            unchanged,
            displaced,
            update_needed,
            desired,
        }
    }
}

fn dedup_preserving_order(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}
