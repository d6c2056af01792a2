//! Fatal configuration errors. Anything raised here aborts a run before any
//! candidate source is queried.

use thiserror::Error;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("scoring weight '{name}' in {context} must be finite and non-negative, got {value}")]
    InvalidWeight {
        context: String,
        name: &'static str,
        value: f64,
    },

    #[error("scoring weights in {context} sum to {sum}, expected {expected} (tolerance {tolerance})")]
    WeightSum {
        context: String,
        sum: f64,
        expected: f64,
        tolerance: f64,
    },

    #[error("artist cap '{name}' must not be negative, got {cap}")]
    NegativeArtistCap { name: String, cap: i64 },

    #[error("diversity floor fraction must be in [0, 1), got {0}")]
    FloorFraction(f64),

    #[error("genre bucket configuration is empty")]
    EmptyBuckets,

    #[error("genre bucket '{0}' has no tags")]
    EmptyBucketTags(String),

    #[error("genre bucket name '{0}' is reserved")]
    ReservedBucketName(String),

    #[error("genre bucket '{0}' is declared more than once")]
    DuplicateBucket(String),

    #[error("playlist size must be a positive integer")]
    ZeroPlaylistSize,

    #[error("{name} must be a positive finite number, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{name} must be a finite non-negative number, got {value}")]
    Negative { name: &'static str, value: f64 },
}
