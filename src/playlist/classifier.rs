use std::collections::HashMap;

use super::config::{GenreBucketConfig, OTHER_BUCKET};

/// Outcome of classifying one track's genre tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification<'a> {
    /// At least one tag matched a configured bucket
    Matched(&'a str),
    /// No tag matched; pooled in the reserved bucket
    Other,
    /// No tag matched and the reserved bucket is excluded
    Excluded,
}

impl<'a> Classification<'a> {
    pub fn bucket(&self) -> Option<&'a str> {
        match self {
            Classification::Matched(name) => Some(name),
            Classification::Other => Some(OTHER_BUCKET),
            Classification::Excluded => None,
        }
    }
}

/// Maps raw genre tags to canonical buckets through a lookup table built once per run
#[derive(Debug, Clone)]
pub struct GenreClassifier {
    bucket_names: Vec<String>,
    tag_index: HashMap<String, Vec<usize>>,
    exclude_other: bool,
}

impl GenreClassifier {
    pub fn new(config: &GenreBucketConfig) -> Self {
        let mut tag_index: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, bucket) in config.buckets.iter().enumerate() {
            for tag in &bucket.tags {
                let tag = tag.trim().to_lowercase();
                if tag.is_empty() {
                    continue;
                }
                let entry = tag_index.entry(tag).or_default();
                if !entry.contains(&index) {
                    entry.push(index);
                }
            }
        }

        Self {
            bucket_names: config.buckets.iter().map(|b| b.name.clone()).collect(),
            tag_index,
            exclude_other: config.exclude_other,
        }
    }

    /// Largest tag intersection wins; ties go to the first-declared bucket.
    /// `tags` must already be normalized (see `Track::normalized_genres`).
    pub fn classify(&self, tags: &[String]) -> Classification<'_> {
        let mut overlap = vec![0usize; self.bucket_names.len()];
        for tag in tags {
            if let Some(buckets) = self.tag_index.get(tag) {
                for &index in buckets {
                    overlap[index] += 1;
                }
            }
        }

        let mut best: Option<(usize, usize)> = None;
        for (index, &count) in overlap.iter().enumerate() {
            if count == 0 {
                continue;
            }
            // strict comparison keeps the earliest bucket on ties
            if best.is_none_or(|(_, best_count)| count > best_count) {
                best = Some((index, count));
            }
        }

        match best {
            Some((index, _)) => Classification::Matched(&self.bucket_names[index]),
            None if self.exclude_other => Classification::Excluded,
            None => Classification::Other,
        }
    }
}
