use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use midnight_radar::api::{create_router, AppState};
use midnight_radar::db::{FingerprintStore, MemoryStore};
use midnight_radar::error::{AppError, AppResult};
use midnight_radar::models::{
    AccessToken, ArtistCredit, ArtistDetails, ArtistRef, ArtistSummary, ArtistsBatch, CatalogPage,
    CatalogRecording, FollowedArtistsPage, LibraryTrack, LikedTracksPage, SavedTrackItem,
    TimeRange, TopArtistsPage, UserProfile,
};
use midnight_radar::services::providers::{CatalogProvider, LibraryProvider};
use midnight_radar::services::recency::FixedClock;
use midnight_radar::services::EngineSettings;

const TOKEN: &str = "test-token";

/// Small fixed library: two liked tracks, one followed artist, no top artists
struct StubLibrary {
    fail_liked: bool,
}

#[async_trait::async_trait]
impl LibraryProvider for StubLibrary {
    async fn fetch_profile(&self, _token: &AccessToken) -> AppResult<UserProfile> {
        Ok(UserProfile {
            display_name: "Test Listener".to_string(),
            ..Default::default()
        })
    }

    async fn fetch_liked_tracks_page(
        &self,
        _token: &AccessToken,
        _offset: u32,
        _limit: u32,
    ) -> AppResult<LikedTracksPage> {
        if self.fail_liked {
            return Err(AppError::ExternalApi("library unavailable".to_string()));
        }

        let track = |id: &str, artist_id: &str, artist: &str, name: &str| SavedTrackItem {
            track: Some(LibraryTrack {
                id: Some(id.to_string()),
                name: name.to_string(),
                artists: vec![ArtistRef {
                    id: Some(artist_id.to_string()),
                    name: artist.to_string(),
                }],
                album: None,
            }),
            added_at: Some("2025-09-20T00:00:00Z".to_string()),
        };

        Ok(LikedTracksPage {
            items: vec![
                track("t1", "a1", "Radiohead", "Reckoner"),
                track("t2", "a2", "Miles Davis", "So What"),
            ],
            next: None,
            total: Some(2),
        })
    }

    async fn fetch_followed_artists_page(
        &self,
        _token: &AccessToken,
        _after: Option<String>,
    ) -> AppResult<FollowedArtistsPage> {
        Ok(FollowedArtistsPage {
            items: vec![ArtistSummary {
                id: "a2".to_string(),
                name: "Miles Davis".to_string(),
            }],
            next: None,
            total: Some(1),
            after: None,
        })
    }

    async fn fetch_top_artists(
        &self,
        _token: &AccessToken,
        _limit: u32,
        _time_range: TimeRange,
    ) -> AppResult<TopArtistsPage> {
        Ok(TopArtistsPage::default())
    }

    async fn fetch_artist_details_batch(
        &self,
        _token: &AccessToken,
        ids: Vec<String>,
    ) -> AppResult<ArtistsBatch> {
        let artists = ids
            .into_iter()
            .map(|id| {
                let (name, genres) = match id.as_str() {
                    "a1" => ("Radiohead", vec!["art rock".to_string()]),
                    _ => ("Miles Davis", vec!["jazz".to_string()]),
                };
                ArtistDetails {
                    id,
                    name: name.to_string(),
                    genres,
                }
            })
            .collect();

        Ok(ArtistsBatch { artists })
    }

    fn name(&self) -> &'static str {
        "stub-library"
    }
}

/// Catalog that never repeats itself
#[derive(Default)]
struct StubCatalog {
    counter: AtomicUsize,
}

#[async_trait::async_trait]
impl CatalogProvider for StubCatalog {
    async fn fetch_catalog_page(
        &self,
        genre: &str,
        limit: u32,
        _offset: u32,
    ) -> AppResult<CatalogPage> {
        let recordings = (0..limit)
            .map(|_| {
                let n = self.counter.fetch_add(1, Ordering::SeqCst);
                CatalogRecording {
                    id: Some(format!("mb-{n}")),
                    title: Some(format!("Track {n}")),
                    artist_credit: vec![ArtistCredit {
                        name: Some(format!("{genre} artist {n}")),
                    }],
                    isrcs: Vec::new(),
                    releases: Vec::new(),
                }
            })
            .collect();

        Ok(CatalogPage { recordings })
    }

    fn name(&self) -> &'static str {
        "stub-catalog"
    }
}

struct TestApp {
    server: TestServer,
    store: Arc<MemoryStore>,
}

fn create_test_app(library: StubLibrary) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let clock = FixedClock(Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap());

    let state = AppState::new(
        Arc::new(library),
        Arc::new(StubCatalog::default()),
        store.clone(),
        EngineSettings::default(),
    )
    .with_clock(Arc::new(clock));

    TestApp {
        server: TestServer::new(create_router(state)).unwrap(),
        store,
    }
}

fn create_test_server() -> TestServer {
    create_test_app(StubLibrary { fail_liked: false }).server
}

fn bearer() -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {TOKEN}")).unwrap()
}

fn ndjson_lines(body: &str) -> Vec<Value> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;

    response.assert_status_ok();
    response.assert_json(&json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server();
    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("abc-123"),
        )
        .await;

    assert_eq!(response.header("x-request-id"), "abc-123");
}

#[tokio::test]
async fn test_fingerprint_requires_token() {
    let server = create_test_server();
    let response = server.post("/api/v1/fingerprint").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_fingerprint_stream_reports_progress_then_completes() {
    let server = create_test_server();
    let response = server
        .post("/api/v1/fingerprint")
        .add_header(AUTHORIZATION, bearer())
        .await;

    response.assert_status_ok();
    let lines = ndjson_lines(&response.text());

    let (last, progress) = lines.split_last().unwrap();
    assert_eq!(last["type"], "complete");
    assert_eq!(last["cached"], false);
    assert_eq!(last["data"]["user"]["display_name"], "Test Listener");

    let genres: Vec<&str> = last["data"]["taste"]["genres"]
        .as_array()
        .unwrap()
        .iter()
        .map(|genre| genre["name"].as_str().unwrap())
        .collect();
    assert_eq!(genres, vec!["jazz", "art_rock"]);

    let percents: Vec<u64> = progress
        .iter()
        .map(|line| {
            assert_eq!(line["type"], "progress");
            line["percent"].as_u64().unwrap()
        })
        .collect();
    assert!(percents.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(percents.last(), Some(&100));
}

#[tokio::test]
async fn test_stored_fingerprint_is_served_from_cache() {
    let server = create_test_server();

    server
        .post("/api/v1/fingerprint")
        .add_header(AUTHORIZATION, bearer())
        .await
        .assert_status_ok();

    let response = server
        .post("/api/v1/fingerprint")
        .add_header(AUTHORIZATION, bearer())
        .await;
    let lines = ndjson_lines(&response.text());

    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["type"], "complete");
    assert_eq!(lines[0]["cached"], true);

    let forced = server
        .post("/api/v1/fingerprint?force=true")
        .add_header(AUTHORIZATION, bearer())
        .await;
    let lines = ndjson_lines(&forced.text());
    assert_eq!(lines.last().unwrap()["cached"], false);
}

#[tokio::test]
async fn test_failed_build_streams_error_and_stores_nothing() {
    let app = create_test_app(StubLibrary { fail_liked: true });

    let response = app
        .server
        .post("/api/v1/fingerprint")
        .add_header(AUTHORIZATION, bearer())
        .await;
    let lines = ndjson_lines(&response.text());

    assert_eq!(lines.last().unwrap()["type"], "error");

    let session = AccessToken::new(TOKEN).unwrap().session_id();
    assert!(app.store.load_fingerprint(&session).await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_fingerprint_not_found() {
    let server = create_test_server();
    let response = server
        .get("/api/v1/fingerprint")
        .add_header(AUTHORIZATION, bearer())
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn test_recommendations_without_fingerprint() {
    let server = create_test_server();
    let response = server
        .post("/api/v1/recommendations")
        .add_header(AUTHORIZATION, bearer())
        .await;

    response.assert_status_not_found();
    let body: Value = response.json();
    assert_eq!(
        body["error"],
        "No fingerprint found. Cannot generate recommendations."
    );
}

#[tokio::test]
async fn test_recommendations_are_never_repeated() {
    let app = create_test_app(StubLibrary { fail_liked: false });

    app.server
        .post("/api/v1/fingerprint")
        .add_header(AUTHORIZATION, bearer())
        .await
        .assert_status_ok();

    let mut seen = HashSet::new();
    for _ in 0..2 {
        let response = app
            .server
            .post("/api/v1/recommendations")
            .add_header(AUTHORIZATION, bearer())
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        let recommendations = body["recommendations"].as_array().unwrap();
        assert_eq!(recommendations.len(), 10);

        for recommendation in recommendations {
            let mrid = recommendation["mrid"].as_str().unwrap().to_string();
            assert!(seen.insert(mrid), "recommendation repeated");
        }
    }

    let session = AccessToken::new(TOKEN).unwrap().session_id();
    let dedupe = app.store.load_dedupe(&session).await.unwrap();
    assert_eq!(dedupe.displayed.len(), 20);
}

#[tokio::test]
async fn test_mark_seen_records_no_video() {
    let app = create_test_app(StubLibrary { fail_liked: false });

    let response = app
        .server
        .post("/api/v1/recommendations/seen")
        .add_header(AUTHORIZATION, bearer())
        .json(&json!({ "mrids": ["boards_of_canada::roygbiv", " "], "no_video": true }))
        .await;

    response.assert_status(StatusCode::NO_CONTENT);

    let session = AccessToken::new(TOKEN).unwrap().session_id();
    let dedupe = app.store.load_dedupe(&session).await.unwrap();
    assert!(dedupe.no_video.contains("boards_of_canada::roygbiv"));
    assert_eq!(dedupe.no_video.len(), 1);
    assert!(dedupe.displayed.is_empty());
}

#[tokio::test]
async fn test_mark_seen_normalizes_client_mrids() {
    let app = create_test_app(StubLibrary { fail_liked: false });

    let response = app
        .server
        .post("/api/v1/recommendations/seen")
        .add_header(AUTHORIZATION, bearer())
        .json(&json!({ "mrids": ["Daft Punk::One More Time"] }))
        .await;

    response.assert_status(StatusCode::NO_CONTENT);

    let session = AccessToken::new(TOKEN).unwrap().session_id();
    let dedupe = app.store.load_dedupe(&session).await.unwrap();
    assert!(dedupe.displayed.contains("daft_punk::one_more_time"));
    assert_eq!(dedupe.displayed.len(), 1);
}

#[tokio::test]
async fn test_mark_seen_rejects_malformed_mrid() {
    let app = create_test_app(StubLibrary { fail_liked: false });

    let response = app
        .server
        .post("/api/v1/recommendations/seen")
        .add_header(AUTHORIZATION, bearer())
        .json(&json!({ "mrids": ["daft_punk::one_more_time", "just a title"] }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);

    let session = AccessToken::new(TOKEN).unwrap().session_id();
    let dedupe = app.store.load_dedupe(&session).await.unwrap();
    assert!(dedupe.displayed.is_empty());
}

#[tokio::test]
async fn test_incompatible_stored_fingerprint() {
    let app = create_test_app(StubLibrary { fail_liked: false });
    let session = AccessToken::new(TOKEN).unwrap().session_id();
    app.store
        .insert_raw(&session, r#"{"version": 99, "taste": {}}"#)
        .await;

    let response = app
        .server
        .get("/api/v1/fingerprint")
        .add_header(AUTHORIZATION, bearer())
        .await;

    response.assert_status(StatusCode::CONFLICT);
}
