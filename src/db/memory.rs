use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::{
    db::FingerprintStore,
    error::AppResult,
    models::{DedupeCache, Fingerprint, SessionId},
    services::codec,
};

/// Process-local store used when no Redis URL is configured, and in tests
///
/// Fingerprints are kept in their encoded form so both backends exercise the
/// same persisted format.
#[derive(Default)]
pub struct MemoryStore {
    fingerprints: RwLock<HashMap<SessionId, String>>,
    dedupe: RwLock<HashMap<SessionId, DedupeCache>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a raw document as-is, bypassing the encoder
    pub async fn insert_raw(&self, session: &SessionId, raw: impl Into<String>) {
        self.fingerprints
            .write()
            .await
            .insert(session.clone(), raw.into());
    }
}

#[async_trait::async_trait]
impl FingerprintStore for MemoryStore {
    async fn load_fingerprint(&self, session: &SessionId) -> AppResult<Option<Fingerprint>> {
        let fingerprints = self.fingerprints.read().await;
        fingerprints
            .get(session)
            .map(|raw| codec::decode(raw))
            .transpose()
    }

    async fn save_fingerprint(
        &self,
        session: &SessionId,
        fingerprint: &Fingerprint,
    ) -> AppResult<()> {
        let encoded = codec::encode(fingerprint)?;
        self.fingerprints
            .write()
            .await
            .insert(session.clone(), encoded);
        Ok(())
    }

    async fn load_dedupe(&self, session: &SessionId) -> AppResult<DedupeCache> {
        let dedupe = self.dedupe.read().await;
        Ok(dedupe.get(session).cloned().unwrap_or_default())
    }

    async fn merge_dedupe(&self, session: &SessionId, additions: &DedupeCache) -> AppResult<()> {
        let mut dedupe = self.dedupe.write().await;
        dedupe.entry(session.clone()).or_default().merge(additions);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{AccessToken, GenreScore, LikedTrack, SeenKind, Taste, TasteArtist, UserProfile};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn session(token: &str) -> SessionId {
        AccessToken::new(token).unwrap().session_id()
    }

    fn fingerprint() -> Fingerprint {
        Fingerprint {
            version: codec::CURRENT_VERSION,
            generated_at: Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap(),
            user: UserProfile {
                display_name: "Tester".to_string(),
                ..Default::default()
            },
            taste: Taste {
                artists: vec![TasteArtist {
                    id: None,
                    name: "radiohead".to_string(),
                    genres: vec!["art_rock".to_string()],
                    is_top_artist: true,
                }],
                liked_tracks: vec![LikedTrack {
                    id: None,
                    artist: "radiohead".to_string(),
                    name: "reckoner".to_string(),
                    added_at: None,
                }],
                genres: vec![GenreScore::new("art_rock", 1.0)],
            },
            seen_recommendations: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_missing_fingerprint_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.load_fingerprint(&session("nobody")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fingerprint_round_trip() {
        let store = MemoryStore::new();
        let session = session("token");

        tokio_test::assert_ok!(store.save_fingerprint(&session, &fingerprint()).await);

        assert_eq!(
            store.load_fingerprint(&session).await.unwrap(),
            Some(fingerprint())
        );
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = MemoryStore::new();
        store
            .save_fingerprint(&session("alice"), &fingerprint())
            .await
            .unwrap();

        assert!(store.load_fingerprint(&session("bob")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_stored_version_is_incompatible() {
        let store = MemoryStore::new();
        let session = session("token");
        store.insert_raw(&session, r#"{"version": 9}"#).await;

        let error = tokio_test::assert_err!(store.load_fingerprint(&session).await);
        assert!(matches!(error, AppError::IncompatibleFormat(_)));
    }

    #[tokio::test]
    async fn test_concurrent_merges_union() {
        let store = Arc::new(MemoryStore::new());
        let session = session("token");

        let mut tasks = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            let session = session.clone();
            tasks.push(tokio::spawn(async move {
                let mut additions = DedupeCache::default();
                let kind = if i % 2 == 0 {
                    SeenKind::Displayed
                } else {
                    SeenKind::NoVideo
                };
                additions.insert(kind, format!("artist_{i}::title"));
                store.merge_dedupe(&session, &additions).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let merged = store.load_dedupe(&session).await.unwrap();
        assert_eq!(merged.displayed.len(), 10);
        assert_eq!(merged.no_video.len(), 10);
    }
}
