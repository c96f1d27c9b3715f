use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use redis::Client;
use std::collections::BTreeSet;
use std::fmt::Display;

use crate::db::FingerprintStore;
use crate::error::AppResult;
use crate::models::{DedupeCache, Fingerprint, SessionId};
use crate::services::codec;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Fingerprint(SessionId),
    Displayed(SessionId),
    NoVideo(SessionId),
}

impl Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKey::Fingerprint(session) => write!(f, "fingerprint:{}", session),
            StoreKey::Displayed(session) => write!(f, "dedupe:displayed:{}", session),
            StoreKey::NoVideo(session) => write!(f, "dedupe:novideo:{}", session),
        }
    }
}

/// Creates a Redis client for the fingerprint store
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Redis-backed store
///
/// The fingerprint is a single string value; each dedupe kind is a Redis set,
/// so concurrent merges from several requests are applied with `SADD` and
/// never overwrite one another.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub async fn new(client: Client) -> AppResult<Self> {
        let connection = ConnectionManager::new(client).await?;
        tracing::info!("Redis fingerprint store connected");
        Ok(Self { connection })
    }

    async fn members(&self, key: &StoreKey) -> AppResult<BTreeSet<String>> {
        let mut conn = self.connection.clone();
        let members: BTreeSet<String> = conn.smembers(key.to_string()).await?;
        Ok(members)
    }

    async fn add_members(&self, key: &StoreKey, members: &BTreeSet<String>) -> AppResult<()> {
        if members.is_empty() {
            return Ok(());
        }

        let mut conn = self.connection.clone();
        let members: Vec<&String> = members.iter().collect();
        let _: () = conn.sadd(key.to_string(), members).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl FingerprintStore for RedisStore {
    async fn load_fingerprint(&self, session: &SessionId) -> AppResult<Option<Fingerprint>> {
        let mut conn = self.connection.clone();
        let stored: Option<String> = conn
            .get(StoreKey::Fingerprint(session.clone()).to_string())
            .await?;

        stored.map(|raw| codec::decode(&raw)).transpose()
    }

    async fn save_fingerprint(
        &self,
        session: &SessionId,
        fingerprint: &Fingerprint,
    ) -> AppResult<()> {
        let encoded = codec::encode(fingerprint)?;

        let mut conn = self.connection.clone();
        let _: () = conn
            .set(StoreKey::Fingerprint(session.clone()).to_string(), encoded)
            .await?;

        tracing::debug!(session = %session, "Fingerprint stored");
        Ok(())
    }

    async fn load_dedupe(&self, session: &SessionId) -> AppResult<DedupeCache> {
        Ok(DedupeCache {
            displayed: self.members(&StoreKey::Displayed(session.clone())).await?,
            no_video: self.members(&StoreKey::NoVideo(session.clone())).await?,
        })
    }

    async fn merge_dedupe(&self, session: &SessionId, additions: &DedupeCache) -> AppResult<()> {
        self.add_members(&StoreKey::Displayed(session.clone()), &additions.displayed)
            .await?;
        self.add_members(&StoreKey::NoVideo(session.clone()), &additions.no_video)
            .await?;

        tracing::debug!(
            session = %session,
            displayed = additions.displayed.len(),
            no_video = additions.no_video.len(),
            "Dedupe sets merged"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
