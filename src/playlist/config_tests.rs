#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::error::{ConfigError, ConfigResult};
    use approx::assert_relative_eq;

    fn base_config_json() -> serde_json::Value {
        serde_json::json!({
            "scoring": {
                "weights": {
                    "popularity": 0.4,
                    "popularity_delta": 0.2,
                    "recency_boost": 0.2,
                    "audio_feature_fit": 0.2
                },
                "period_weights": {
                    "weekly": {
                        "popularity": 0.1,
                        "popularity_delta": 0.5,
                        "recency_boost": 0.3,
                        "audio_feature_fit": 0.1
                    }
                },
                "recency": {"horizon_days": 90, "decay": {"kind": "exponential", "half_life_days": 30.0}},
                "target_profile": {"energy": 0.7, "valence": 0.6}
            },
            "genres": {
                "buckets": {
                    "Rock": ["rock", "alt rock"],
                    "Pop": ["pop", "dance pop"],
                    "Jazz": ["jazz"]
                }
            },
            "artist_caps": {"daily": 2, "weekly": 3, "default": 4},
            "diversity_floor_fraction": 0.1,
            "playlist": {"size": 30, "type": "daily"}
        })
    }

    fn parse(value: serde_json::Value) -> ConfigResult<CuratorConfig> {
        CuratorConfig::from_json_str(&value.to_string())
    }

    #[test]
    fn test_full_config_parses() {
        let config = parse(base_config_json()).unwrap();

        assert_eq!(config.playlist.size, 30);
        assert_eq!(config.playlist.playlist_type.as_deref(), Some("daily"));
        assert_eq!(config.playlist.update_mode, UpdateMode::Replace);
        assert_eq!(config.playlist.order_tolerance, None);
        assert_relative_eq!(config.scoring.weight_total, 1.0);
        assert_relative_eq!(config.scoring.delta_max, 20.0);
        assert_eq!(config.scoring.recency.horizon_days, 90);
        assert_eq!(
            config.scoring.recency.decay,
            RecencyDecay::Exponential { half_life_days: 30.0 }
        );
        assert_eq!(config.scoring.target_profile.energy, Some(0.7));
        assert_eq!(config.scoring.target_profile.danceability, None);
        assert!(config.filters.allow_explicit);
        assert_eq!(config.floor_quota(), 3);
    }

    fn ordered_config(buckets: &str, exclude_other: bool) -> ConfigResult<CuratorConfig> {
        CuratorConfig::from_json_str(&format!(
            r#"{{
                "scoring": {{
                    "weights": {{"popularity": 1.0, "popularity_delta": 0.0, "recency_boost": 0.0, "audio_feature_fit": 0.0}}
                }},
                "genres": {{"buckets": {buckets}, "exclude_other": {exclude_other}}},
                "playlist": {{"size": 10}}
            }}"#
        ))
    }

    #[test]
    fn test_bucket_order_follows_declaration() {
        let buckets = r#"{"Rock": ["rock"], "Pop": ["pop"], "Jazz": ["jazz"]}"#;

        let config = ordered_config(buckets, false).unwrap();
        assert_eq!(config.genres.bucket_order(), vec!["Rock", "Pop", "Jazz", OTHER_BUCKET]);

        let config = ordered_config(buckets, true).unwrap();
        assert_eq!(config.genres.bucket_order(), vec!["Rock", "Pop", "Jazz"]);
    }

    #[test]
    fn test_bucket_order_survives_round_trip() {
        let config = ordered_config(r#"{"Rock": ["rock"], "Jazz": ["jazz"], "Pop": ["pop"]}"#, false).unwrap();
        let text = serde_json::to_string(&config).unwrap();
        let reparsed = CuratorConfig::from_json_str(&text).unwrap();
        assert_eq!(reparsed.genres.buckets, config.genres.buckets);
        assert_eq!(reparsed.genres.bucket_order(), vec!["Rock", "Jazz", "Pop", OTHER_BUCKET]);
    }

    #[test]
    fn test_duplicate_bucket_rejected() {
        let result = ordered_config(r#"{"Pop": ["pop"], "pop": ["dance pop"]}"#, false);
        assert!(matches!(result, Err(ConfigError::DuplicateBucket(name)) if name == "pop"));
    }

    #[test]
    fn test_artist_caps_per_type() {
        let config = parse(base_config_json()).unwrap();
        assert_eq!(config.artist_caps.cap_for(Some("daily")), 2);
        assert_eq!(config.artist_caps.cap_for(Some("weekly")), 3);
        assert_eq!(config.artist_caps.cap_for(Some("monthly")), 4);
        assert_eq!(config.artist_caps.cap_for(None), 4);
        assert_eq!(ArtistCapConfig::default().cap_for(Some("daily")), DEFAULT_ARTIST_CAP);
    }

    #[test]
    fn test_period_weights_override() {
        let config = parse(base_config_json()).unwrap();
        assert_relative_eq!(config.scoring.weights_for(Some("weekly")).popularity_delta, 0.5);
        assert_relative_eq!(config.scoring.weights_for(Some("daily")).popularity, 0.4);
        assert_relative_eq!(config.scoring.weights_for(None).popularity, 0.4);
    }

    #[test]
    fn test_weight_sum_outside_tolerance_rejected() {
        let mut value = base_config_json();
        value["scoring"]["weights"]["popularity"] = serde_json::json!(0.5);
        assert!(matches!(parse(value), Err(ConfigError::WeightSum { .. })));
    }

    #[test]
    fn test_custom_weight_total() {
        let mut value = base_config_json();
        value["scoring"]["weight_total"] = serde_json::json!(2.0);
        assert!(matches!(parse(value.clone()), Err(ConfigError::WeightSum { .. })));

        value["scoring"]["weights"] = serde_json::json!({
            "popularity": 1.0, "popularity_delta": 0.5, "recency_boost": 0.5, "audio_feature_fit": 0.0
        });
        value["scoring"]["period_weights"] = serde_json::json!({});
        assert!(parse(value).is_ok());
    }

    #[test]
    fn test_period_weights_validated() {
        let mut value = base_config_json();
        value["scoring"]["period_weights"]["weekly"]["recency_boost"] = serde_json::json!(0.9);
        match parse(value) {
            Err(ConfigError::WeightSum { context, .. }) => {
                assert_eq!(context, "scoring.period_weights.weekly");
            }
            other => panic!("expected weight sum error, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut value = base_config_json();
        value["scoring"]["weights"] = serde_json::json!({
            "popularity": 1.2, "popularity_delta": -0.2, "recency_boost": 0.0, "audio_feature_fit": 0.0
        });
        assert!(matches!(
            parse(value),
            Err(ConfigError::InvalidWeight { name: "popularity_delta", .. })
        ));
    }

    #[test]
    fn test_negative_artist_cap_rejected() {
        let mut value = base_config_json();
        value["artist_caps"]["daily"] = serde_json::json!(-1);
        assert!(matches!(
            parse(value),
            Err(ConfigError::NegativeArtistCap { cap: -1, .. })
        ));
    }

    #[test]
    fn test_floor_fraction_range() {
        for bad in [1.0, 1.5, -0.1] {
            let mut value = base_config_json();
            value["diversity_floor_fraction"] = serde_json::json!(bad);
            assert!(matches!(parse(value), Err(ConfigError::FloorFraction(_))));
        }

        let mut value = base_config_json();
        value["diversity_floor_fraction"] = serde_json::json!(0.0);
        assert_eq!(parse(value).unwrap().floor_quota(), 0);
    }

    #[test]
    fn test_floor_quota_rounds_down() {
        let mut value = base_config_json();
        value["diversity_floor_fraction"] = serde_json::json!(0.29);
        value["playlist"]["size"] = serde_json::json!(100);
        assert_eq!(parse(value).unwrap().floor_quota(), 29);

        let mut value = base_config_json();
        value["diversity_floor_fraction"] = serde_json::json!(0.15);
        value["playlist"]["size"] = serde_json::json!(10);
        assert_eq!(parse(value).unwrap().floor_quota(), 1);

        // a product genuinely below an integer is not rounded up
        let mut value = base_config_json();
        value["diversity_floor_fraction"] = serde_json::json!(0.2999999999999);
        value["playlist"]["size"] = serde_json::json!(10);
        assert_eq!(parse(value).unwrap().floor_quota(), 2);
    }

    #[test]
    fn test_weight_tolerance_must_be_non_negative() {
        let mut config = ordered_config(r#"{"Pop": ["pop"]}"#, false).unwrap();
        config.scoring.weight_tolerance = 0.0;
        assert!(config.validate().is_ok());

        config.scoring.weight_tolerance = -1e-3;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Negative { name: "scoring.weight_tolerance", .. }));
        assert!(err.to_string().contains("non-negative"));
    }

    #[test]
    fn test_bucket_validation() {
        let mut value = base_config_json();
        value["genres"]["buckets"] = serde_json::json!({});
        assert!(matches!(parse(value), Err(ConfigError::EmptyBuckets)));

        let mut value = base_config_json();
        value["genres"]["buckets"] = serde_json::json!({"Pop": ["pop"], "Other": ["misc"]});
        assert!(matches!(parse(value), Err(ConfigError::ReservedBucketName(_))));

        let mut value = base_config_json();
        value["genres"]["buckets"] = serde_json::json!({"Pop": ["pop"], "Jazz": ["  "]});
        assert!(matches!(parse(value), Err(ConfigError::EmptyBucketTags(name)) if name == "Jazz"));
    }

    #[test]
    fn test_zero_playlist_size_rejected() {
        let mut value = base_config_json();
        value["playlist"]["size"] = serde_json::json!(0);
        assert!(matches!(parse(value), Err(ConfigError::ZeroPlaylistSize)));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(
            CuratorConfig::from_json_str("{\"scoring\": "),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            CuratorConfig::load_from_file("/nonexistent/curator.json"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_accumulate_settings() {
        let mut value = base_config_json();
        value["playlist"]["update_mode"] = serde_json::json!("accumulate");
        value["playlist"]["max_size"] = serde_json::json!(50);
        value["playlist"]["order_tolerance"] = serde_json::json!(2);
        let config = parse(value).unwrap();
        assert_eq!(config.playlist.update_mode, UpdateMode::Accumulate);
        assert_eq!(config.playlist.max_size, Some(50));
        assert_eq!(config.playlist.order_tolerance, Some(2));
    }
}
