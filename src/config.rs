use std::path::PathBuf;

/// Default location of the curator configuration
pub const DEFAULT_CONFIG_PATH: &str = "curator.json";

/// Runtime settings read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub config_path: PathBuf,
    /// Snapshot of the managed playlist; absent means the playlist is new
    pub state_path: Option<PathBuf>,
    pub playlist_type: Option<String>,
}

/// Load settings from `.env` and the environment
pub fn load_config() -> AppConfig {
    // Load `.env` file if present
    dotenv::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok())
}

/// Build settings from an arbitrary variable lookup
pub fn from_lookup<F>(lookup: F) -> AppConfig
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    AppConfig {
        config_path: non_empty("CURATOR_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
        state_path: non_empty("CURATOR_PLAYLIST_STATE").map(PathBuf::from),
        playlist_type: non_empty("CURATOR_PLAYLIST_TYPE"),
    }
}
