use std::collections::HashMap;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Top-level application settings.
///
/// Loaded from `config/default.toml` (optional) with `LINGUALINK_*`
/// environment overrides, e.g. `LINGUALINK_SERVER__PORT=9000`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub rooms: RoomSettings,
    #[serde(default)]
    pub matchmaking: MatchmakingSettings,
    #[serde(default)]
    pub translation: TranslationSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomSettings {
    /// Seconds an untouched room survives before the sweeper reclaims it.
    /// Disconnect handling is the primary cleanup path; this is the safety net.
    pub ttl_secs: u64,
    /// Sweeper wake-up interval in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            sweep_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchmakingSettings {
    /// Seconds a queued user waits before receiving `matchmaking_timeout`.
    pub timeout_secs: u64,
    /// Closed set of languages accepted by join/find-match intents.
    pub supported_languages: Vec<String>,
    /// Fixed complementary-language table used when a find-match request
    /// carries no explicit preference. A bijection, not an N-language policy.
    pub complementary: HashMap<String, String>,
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        let mut complementary = HashMap::new();
        complementary.insert("en".to_string(), "hi".to_string());
        complementary.insert("hi".to_string(), "en".to_string());
        Self {
            timeout_secs: 60,
            supported_languages: vec!["en".to_string(), "hi".to_string()],
            complementary,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslationSettings {
    /// Base URL of the translation REST service.
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Translation cache capacity (entries).
    pub cache_capacity: usize,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_ms: 5000,
            cache_capacity: 100,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(Environment::with_prefix("LINGUALINK").separator("__"))
            .build()?
            .try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            rooms: RoomSettings::default(),
            matchmaking: MatchmakingSettings::default(),
            translation: TranslationSettings::default(),
        }
    }
}
