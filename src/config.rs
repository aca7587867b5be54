use std::{env, str::FromStr};
use tracing::warn;

use crate::audio::{cache::DEFAULT_URL_CACHE_CAPACITY, enums::Quality};
use crate::model::CommentSortType;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub api: ApiConfig,
    pub audio: AudioConfig,
    pub comments: CommentConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub real_ip: Option<String>,
    pub cookie: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.cook-onion.fun".to_string(),
            real_ip: Some("114.114.114.114".to_string()),
            cookie: None,
            request_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub volume: f32,
    pub volume_step: f32,
    pub seek_step_secs: f64,
    pub quality: Quality,
    pub url_cache_capacity: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            volume: 0.5,
            volume_step: 0.05,
            seek_step_secs: 5.0,
            quality: Quality::Exhigh,
            url_cache_capacity: DEFAULT_URL_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommentConfig {
    pub page_size: u32,
    pub sort_type: CommentSortType,
}

impl Default for CommentConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            sort_type: CommentSortType::Recommended,
        }
    }
}

impl Config {
    /// Defaults overridden by `MELODECK_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();

        if let Some(base) = lookup("MELODECK_API_BASE") {
            config.api.base_url = base;
        }
        if let Some(ip) = lookup("MELODECK_REAL_IP") {
            config.api.real_ip = Some(ip).filter(|ip| !ip.is_empty());
        }
        config.api.cookie = lookup("MELODECK_COOKIE").filter(|c| !c.is_empty());
        parse_into(&lookup, "MELODECK_TIMEOUT_SECS", &mut config.api.request_timeout_secs);

        parse_into(&lookup, "MELODECK_VOLUME", &mut config.audio.volume);
        config.audio.volume = config.audio.volume.clamp(0.0, 1.0);
        parse_into(&lookup, "MELODECK_QUALITY", &mut config.audio.quality);

        parse_into(&lookup, "MELODECK_COMMENT_PAGE_SIZE", &mut config.comments.page_size);
        parse_into(&lookup, "MELODECK_COMMENT_SORT", &mut config.comments.sort_type);

        config
    }
}

fn parse_into<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T) {
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *slot = value,
        Err(_) => warn!(key, value = raw.as_str(), "config_value_ignored"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config.api.base_url, "https://api.cook-onion.fun");
        assert_eq!(config.api.real_ip.as_deref(), Some("114.114.114.114"));
        assert_eq!(config.audio.volume, 0.5);
        assert_eq!(config.audio.quality, Quality::Exhigh);
        assert_eq!(config.audio.url_cache_capacity, 100);
        assert_eq!(config.comments.page_size, 20);
    }

    #[test]
    fn test_overrides_and_invalid_values() {
        let config = Config::from_lookup(lookup(&[
            ("MELODECK_API_BASE", "http://localhost:3000"),
            ("MELODECK_REAL_IP", ""),
            ("MELODECK_COOKIE", "MUSIC_U=x"),
            ("MELODECK_VOLUME", "3.0"),
            ("MELODECK_QUALITY", "ultra"),
            ("MELODECK_COMMENT_SORT", "latest"),
        ]));
        assert_eq!(config.api.base_url, "http://localhost:3000");
        assert_eq!(config.api.real_ip, None);
        assert_eq!(config.api.cookie.as_deref(), Some("MUSIC_U=x"));
        assert_eq!(config.audio.volume, 1.0);
        assert_eq!(config.audio.quality, Quality::Exhigh);
        assert_eq!(config.comments.sort_type, CommentSortType::Latest);
    }
}
