use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use midnight_radar::api::{create_router, AppState};
use midnight_radar::config::Config;
use midnight_radar::db::{create_redis_client, FingerprintStore, MemoryStore, RedisStore};
use midnight_radar::services::providers::{MusicBrainzProvider, SpotifyProvider};
use midnight_radar::services::RateLimiter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // One limiter per upstream, shared by every request
    let spotify_limiter = Arc::new(RateLimiter::new(
        "spotify",
        Duration::from_millis(config.spotify_min_delay_ms),
    ));
    let musicbrainz_limiter = Arc::new(RateLimiter::new(
        "musicbrainz",
        Duration::from_millis(config.musicbrainz_min_delay_ms),
    ));

    let library = Arc::new(SpotifyProvider::new(
        config.spotify_api_url.clone(),
        spotify_limiter,
    ));
    let catalog = Arc::new(MusicBrainzProvider::new(
        config.musicbrainz_api_url.clone(),
        config.musicbrainz_user_agent.clone(),
        musicbrainz_limiter,
    ));

    let store: Arc<dyn FingerprintStore> = match &config.redis_url {
        Some(redis_url) => {
            let client = create_redis_client(redis_url)?;
            Arc::new(RedisStore::new(client).await?)
        }
        None => {
            tracing::warn!("REDIS_URL not set, fingerprints are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(library, catalog, store.clone(), config.engine_settings());
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, store = store.name(), "Server running");

    axum::serve(listener, app).await?;

    Ok(())
}
