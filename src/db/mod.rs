pub mod memory;
pub mod redis;

pub use memory::MemoryStore;
pub use redis::create_redis_client;
pub use redis::RedisStore;
pub use redis::StoreKey;

use crate::{
    error::AppResult,
    models::{DedupeCache, Fingerprint, SessionId},
};

/// Per-session persistence for fingerprints and the recommendation dedupe sets
///
/// Fingerprints go through the versioned codec, so a stored document from an
/// older release either decodes or fails with `IncompatibleFormat`.
#[async_trait::async_trait]
pub trait FingerprintStore: Send + Sync {
    async fn load_fingerprint(&self, session: &SessionId) -> AppResult<Option<Fingerprint>>;

    async fn save_fingerprint(&self, session: &SessionId, fingerprint: &Fingerprint)
        -> AppResult<()>;

    async fn load_dedupe(&self, session: &SessionId) -> AppResult<DedupeCache>;

    /// Union `additions` into the stored sets; never drops existing members
    async fn merge_dedupe(&self, session: &SessionId, additions: &DedupeCache) -> AppResult<()>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}
