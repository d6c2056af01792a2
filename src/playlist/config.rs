use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ConfigError, ConfigResult};
use crate::models::AudioFeatures;

/// Reserved bucket for tracks whose tags match no configured bucket
pub const OTHER_BUCKET: &str = "Other";

/// Cap applied when neither the playlist type nor a default cap is configured
pub const DEFAULT_ARTIST_CAP: usize = 5;

/// Complete configuration for one curation run, loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuratorConfig {
    pub scoring: ScoringConfig,
    pub genres: GenreBucketConfig,
    #[serde(default)]
    pub artist_caps: ArtistCapConfig,
    #[serde(default)]
    pub diversity_floor_fraction: f64,
    #[serde(default)]
    pub allocation: AllocationSettings,
    #[serde(default)]
    pub filters: FilterSettings,
    pub playlist: PlaylistSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    #[serde(default = "default_weight_total")]
    pub weight_total: f64,
    #[serde(default = "default_weight_tolerance")]
    pub weight_tolerance: f64,
    /// Weight overrides keyed by playlist type
    #[serde(default)]
    pub period_weights: BTreeMap<String, ScoringWeights>,
    /// Expected maximum popularity swing; larger deltas saturate
    #[serde(default = "default_delta_max")]
    pub delta_max: f64,
    #[serde(default)]
    pub recency: RecencySettings,
    #[serde(default)]
    pub target_profile: AudioFeatures,
}

/// Weights of the four normalized sub-scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub popularity: f64,
    pub popularity_delta: f64,
    pub recency_boost: f64,
    pub audio_feature_fit: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecencySettings {
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    #[serde(default)]
    pub decay: RecencyDecay,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecencyDecay {
    #[default]
    Linear,
    Exponential { half_life_days: f64 },
}

/// Canonical buckets in declaration order; the order doubles as bucket priority
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenreBucketConfig {
    #[serde(
        deserialize_with = "deserialize_ordered_buckets",
        serialize_with = "serialize_ordered_buckets"
    )]
    pub buckets: Vec<GenreBucket>,
    /// Drop unmatched tracks instead of pooling them in the reserved bucket
    #[serde(default)]
    pub exclude_other: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenreBucket {
    pub name: String,
    pub tags: Vec<String>,
}

/// Per playlist-type artist caps, e.g. `{"daily": 2, "default": 5}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtistCapConfig {
    #[serde(default)]
    pub default: Option<i64>,
    #[serde(default)]
    pub dominant: Option<DominantArtists>,
    #[serde(flatten)]
    pub per_type: BTreeMap<String, i64>,
}

/// Named artists allowed a different ceiling than the playlist-type cap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DominantArtists {
    pub artists: Vec<String>,
    pub cap: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocationSettings {
    /// Number of top scores summed into a bucket's mass; defaults to the playlist size
    #[serde(default)]
    pub mass_top_k: Option<usize>,
    /// Upper bounds on individual bucket quotas
    #[serde(default)]
    pub bucket_caps: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSettings {
    #[serde(default)]
    pub min_popularity: u8,
    #[serde(default = "default_true")]
    pub allow_explicit: bool,
    #[serde(default)]
    pub exclude_current_tracks: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistSettings {
    pub size: usize,
    #[serde(default, rename = "type")]
    pub playlist_type: Option<String>,
    #[serde(default)]
    pub update_mode: UpdateMode,
    /// Upper bound for accumulating playlists; oldest tracks are trimmed first
    #[serde(default)]
    pub max_size: Option<usize>,
    /// `None` ignores ordering; `Some(n)` tolerates up to `n` displaced tracks
    #[serde(default)]
    pub order_tolerance: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    #[default]
    Replace,
    Accumulate,
}

fn default_weight_total() -> f64 {
    1.0
}

fn default_weight_tolerance() -> f64 {
    1e-6
}

fn default_delta_max() -> f64 {
    20.0
}

fn default_horizon_days() -> u32 {
    365
}

fn default_true() -> bool {
    true
}

impl Default for RecencySettings {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
            decay: RecencyDecay::Linear,
        }
    }
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            min_popularity: 0,
            allow_explicit: true,
            exclude_current_tracks: false,
        }
    }
}

impl ScoringWeights {
    pub fn named(&self) -> [(&'static str, f64); 4] {
        [
            ("popularity", self.popularity),
            ("popularity_delta", self.popularity_delta),
            ("recency_boost", self.recency_boost),
            ("audio_feature_fit", self.audio_feature_fit),
        ]
    }

    pub fn sum(&self) -> f64 {
        self.named().iter().map(|(_, weight)| weight).sum()
    }

    /// Reject negative or non-finite weights and sums outside `expected ± tolerance`
    pub fn validate(&self, context: &str, expected: f64, tolerance: f64) -> ConfigResult<()> {
        for (name, value) in self.named() {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    context: context.to_string(),
                    name,
                    value,
                });
            }
        }

        let sum = self.sum();
        if !sum.is_finite() || (sum - expected).abs() > tolerance {
            return Err(ConfigError::WeightSum {
                context: context.to_string(),
                sum,
                expected,
                tolerance,
            });
        }
        Ok(())
    }
}

impl ScoringConfig {
    /// Effective weights for a playlist type, falling back to the base weights
    pub fn weights_for(&self, playlist_type: Option<&str>) -> ScoringWeights {
        playlist_type
            .and_then(|kind| self.period_weights.get(kind))
            .copied()
            .unwrap_or(self.weights)
    }

    fn validate(&self) -> ConfigResult<()> {
        require_positive("scoring.weight_total", self.weight_total)?;
        if !self.weight_tolerance.is_finite() || self.weight_tolerance < 0.0 {
            return Err(ConfigError::Negative {
                name: "scoring.weight_tolerance",
                value: self.weight_tolerance,
            });
        }

        self.weights
            .validate("scoring.weights", self.weight_total, self.weight_tolerance)?;
        for (playlist_type, weights) in &self.period_weights {
            weights.validate(
                &format!("scoring.period_weights.{playlist_type}"),
                self.weight_total,
                self.weight_tolerance,
            )?;
        }

        require_positive("scoring.delta_max", self.delta_max)?;
        if self.recency.horizon_days == 0 {
            return Err(ConfigError::NonPositive {
                name: "scoring.recency.horizon_days",
                value: 0.0,
            });
        }
        if let RecencyDecay::Exponential { half_life_days } = self.recency.decay {
            require_positive("scoring.recency.decay.half_life_days", half_life_days)?;
        }
        Ok(())
    }
}

impl GenreBucketConfig {
    /// Bucket names in priority order, including the reserved bucket unless excluded
    pub fn bucket_order(&self) -> Vec<String> {
        let mut order: Vec<String> = self.buckets.iter().map(|b| b.name.clone()).collect();
        if !self.exclude_other {
            order.push(OTHER_BUCKET.to_string());
        }
        order
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.buckets.is_empty() {
            return Err(ConfigError::EmptyBuckets);
        }

        let mut seen = HashSet::new();
        for bucket in &self.buckets {
            if bucket.name.trim().eq_ignore_ascii_case(OTHER_BUCKET) {
                return Err(ConfigError::ReservedBucketName(bucket.name.clone()));
            }
            if !seen.insert(bucket.name.trim().to_lowercase()) {
                return Err(ConfigError::DuplicateBucket(bucket.name.clone()));
            }
            if bucket.tags.iter().all(|tag| tag.trim().is_empty()) {
                return Err(ConfigError::EmptyBucketTags(bucket.name.clone()));
            }
        }
        Ok(())
    }
}

impl ArtistCapConfig {
    /// Cap for a playlist type: its own entry, then `default`, then [`DEFAULT_ARTIST_CAP`]
    pub fn cap_for(&self, playlist_type: Option<&str>) -> usize {
        playlist_type
            .and_then(|kind| self.per_type.get(kind))
            .or(self.default.as_ref())
            .map(|cap| (*cap).max(0) as usize)
            .unwrap_or(DEFAULT_ARTIST_CAP)
    }

    fn validate(&self) -> ConfigResult<()> {
        let named = self
            .per_type
            .iter()
            .map(|(name, cap)| (name.clone(), *cap))
            .chain(self.default.map(|cap| ("default".to_string(), cap)))
            .chain(
                self.dominant
                    .as_ref()
                    .map(|dominant| ("dominant".to_string(), dominant.cap)),
            );

        for (name, cap) in named {
            if cap < 0 {
                return Err(ConfigError::NegativeArtistCap { name, cap });
            }
        }
        Ok(())
    }
}

impl CuratorConfig {
    /// Load and validate a configuration file
    pub fn load_from_file(path: &str) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: CuratorConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.scoring.validate()?;
        self.genres.validate()?;
        self.artist_caps.validate()?;

        if !(0.0..1.0).contains(&self.diversity_floor_fraction) {
            return Err(ConfigError::FloorFraction(self.diversity_floor_fraction));
        }
        if self.playlist.size == 0 {
            return Err(ConfigError::ZeroPlaylistSize);
        }
        Ok(())
    }

    /// Floor quota for any non-empty bucket: `floor(f × N)`
    pub fn floor_quota(&self) -> usize {
        let product = self.diversity_floor_fraction * self.playlist.size as f64;
        let nearest = product.round();
        // only representation error is snapped, e.g. 0.29 × 100 = 28.999999999999996
        if (product - nearest).abs() <= 4.0 * f64::EPSILON * nearest.max(1.0) {
            nearest as usize
        } else {
            product.floor() as usize
        }
    }
}

fn require_positive(name: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

/// Reads `{"Pop": ["pop", ...], "Rock": [...]}` keeping document order
fn deserialize_ordered_buckets<'de, D>(deserializer: D) -> Result<Vec<GenreBucket>, D::Error>
where
    D: Deserializer<'de>,
{
    struct BucketVisitor;

    impl<'de> Visitor<'de> for BucketVisitor {
        type Value = Vec<GenreBucket>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map of bucket name to genre tags")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut buckets = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, tags)) = map.next_entry::<String, Vec<String>>()? {
                buckets.push(GenreBucket { name, tags });
            }
            Ok(buckets)
        }
    }

    deserializer.deserialize_map(BucketVisitor)
}

#[allow(clippy::ptr_arg)]
fn serialize_ordered_buckets<S>(buckets: &Vec<GenreBucket>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(buckets.len()))?;
    for bucket in buckets {
        map.serialize_entry(&bucket.name, &bucket.tags)?;
    }
    map.end()
}
