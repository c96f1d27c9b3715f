use serde::Deserialize;

use crate::services::EngineSettings;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Redis connection URL. Without one the server keeps state in memory.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Spotify Web API base URL
    #[serde(default = "default_spotify_api_url")]
    pub spotify_api_url: String,

    /// MusicBrainz web service base URL
    #[serde(default = "default_musicbrainz_api_url")]
    pub musicbrainz_api_url: String,

    /// User-Agent sent to MusicBrainz, which rejects anonymous clients
    #[serde(default = "default_musicbrainz_user_agent")]
    pub musicbrainz_user_agent: String,

    /// Minimum delay between consecutive Spotify requests
    #[serde(default = "default_spotify_min_delay_ms")]
    pub spotify_min_delay_ms: u64,

    /// Minimum delay between consecutive MusicBrainz requests
    #[serde(default = "default_musicbrainz_min_delay_ms")]
    pub musicbrainz_min_delay_ms: u64,

    #[serde(default = "default_target_recommendations")]
    pub target_recommendations: usize,

    #[serde(default = "default_genre_batch_size")]
    pub genre_batch_size: usize,

    #[serde(default = "default_min_genre_pool")]
    pub min_genre_pool: usize,

    #[serde(default = "default_discover_limit")]
    pub discover_limit: u32,

    #[serde(default = "default_max_pool_attempts")]
    pub max_pool_attempts: u32,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_spotify_api_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_musicbrainz_api_url() -> String {
    "https://musicbrainz.org/ws/2".to_string()
}

fn default_musicbrainz_user_agent() -> String {
    "MidnightRadar/0.1".to_string()
}

fn default_spotify_min_delay_ms() -> u64 {
    100
}

fn default_musicbrainz_min_delay_ms() -> u64 {
    1000 // 1 request per second per MusicBrainz guidelines
}

fn default_target_recommendations() -> usize {
    EngineSettings::default().target_recommendations
}

fn default_genre_batch_size() -> usize {
    EngineSettings::default().genre_batch_size
}

fn default_min_genre_pool() -> usize {
    EngineSettings::default().min_genre_pool
}

fn default_discover_limit() -> u32 {
    EngineSettings::default().discover_limit
}

fn default_max_pool_attempts() -> u32 {
    EngineSettings::default().max_pool_attempts
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Recommendation engine bounds taken from this configuration
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            target_recommendations: self.target_recommendations,
            genre_batch_size: self.genre_batch_size,
            min_genre_pool: self.min_genre_pool,
            discover_limit: self.discover_limit,
            max_pool_attempts: self.max_pool_attempts,
        }
    }
}
