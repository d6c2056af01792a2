use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// A catalog track as reported by a discovery source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Stable catalog id. Tracks without one are rejected during aggregation.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(alias = "name", deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub artists: Vec<Artist>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub genres: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub popularity: u8,
    #[serde(default)]
    pub popularity_delta: Option<i32>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub explicit: bool,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub audio_features: Option<AudioFeatures>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
}

/// Pre-computed audio features, each in 0.0..=1.0 when present
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    #[serde(default)]
    pub energy: Option<f64>,
    #[serde(default)]
    pub danceability: Option<f64>,
    #[serde(default)]
    pub valence: Option<f64>,
    #[serde(default)]
    pub acousticness: Option<f64>,
    #[serde(default)]
    pub instrumentalness: Option<f64>,
}

/// Reads an explicit `null` the same way as a missing key
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl AudioFeatures {
    /// Feature values in a fixed dimension order; non-finite values count as absent
    pub fn dimensions(&self) -> [Option<f64>; 5] {
        [
            self.energy,
            self.danceability,
            self.valence,
            self.acousticness,
            self.instrumentalness,
        ]
        .map(|value| value.filter(|v| v.is_finite()))
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions().iter().all(Option::is_none)
    }
}

/// Key used for artist caps when a track has no credited artist
pub const UNKNOWN_ARTIST_KEY: &str = "unknown";

impl Track {
    /// Catalog id, trimmed; `None` when missing or blank
    pub fn catalog_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn primary_artist(&self) -> Option<&Artist> {
        self.artists.first()
    }

    /// Identity of the primary artist: its id when known, otherwise its lower-cased name
    pub fn primary_artist_key(&self) -> String {
        match self.primary_artist() {
            Some(artist) => artist.key(),
            None => UNKNOWN_ARTIST_KEY.to_string(),
        }
    }

    pub fn artist_display(&self) -> String {
        if self.artists.is_empty() {
            return "Unknown".to_string();
        }
        self.artists
            .iter()
            .map(|artist| artist.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Raw genre tags normalized for lookup (trimmed, lower-cased, deduplicated)
    pub fn normalized_genres(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .genres
            .iter()
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .collect();
        tags.sort();
        tags.dedup();
        tags
    }

    /// Parse the release date at day, month or year precision
    pub fn parsed_release_date(&self) -> Option<NaiveDate> {
        let raw = self.release_date.as_deref()?.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(date);
        }
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d") {
            return Some(date);
        }
        let year: i32 = raw.parse().ok()?;
        NaiveDate::from_ymd_opt(year, 1, 1)
    }

    pub fn has_audio_features(&self) -> bool {
        self.audio_features
            .as_ref()
            .is_some_and(|features| !features.is_empty())
    }
}

impl Artist {
    pub fn key(&self) -> String {
        match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => self.name.trim().to_lowercase(),
        }
    }

    /// Whether this artist is named by `reference` (an id or a case-insensitive name)
    pub fn matches(&self, reference: &str) -> bool {
        let reference = reference.trim();
        self.id.as_deref().map(str::trim) == Some(reference)
            || self.name.trim().eq_ignore_ascii_case(reference)
    }
}

impl Default for Track {
    fn default() -> Self {
        Track {
            id: None,
            title: "Unknown".to_string(),
            artists: Vec::new(),
            genres: Vec::new(),
            popularity: 0,
            popularity_delta: None,
            release_date: None,
            explicit: false,
            uri: None,
            audio_features: None,
        }
    }
}
