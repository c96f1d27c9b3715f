//! Spotify Web API library provider
//!
//! Reads the signals the fingerprint is built from: saved tracks, followed
//! artists, top artists, and batched artist details (for genres). All calls
//! go through one shared rate limiter.
use crate::{
    error::AppResult,
    models::{
        AccessToken, ArtistDetails, ArtistSummary, ArtistsBatch, FollowedArtistsPage,
        LikedTracksPage, TimeRange, TopArtistsPage, UserProfile,
    },
    services::{
        providers::{ensure_success, LibraryProvider, MAX_ARTIST_BATCH},
        rate_limiter::RateLimiter,
    },
};
use reqwest::Client as HttpClient;
use serde::Deserialize;
use std::sync::Arc;

const PROVIDER: &str = "spotify";
const MAX_PAGE_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
struct ApiFollowedArtistsResponse {
    artists: ApiFollowedArtists,
}

#[derive(Debug, Deserialize)]
struct ApiFollowedArtists {
    #[serde(default)]
    items: Vec<ArtistSummary>,
    next: Option<String>,
    #[serde(default)]
    total: Option<u32>,
    #[serde(default)]
    cursors: Option<ApiCursors>,
}

#[derive(Debug, Deserialize)]
struct ApiCursors {
    #[serde(default)]
    after: Option<String>,
}

/// Unknown IDs come back as `null` entries
#[derive(Debug, Deserialize)]
struct ApiArtistsResponse {
    #[serde(default)]
    artists: Vec<Option<ArtistDetails>>,
}

#[derive(Debug, Deserialize)]
struct ApiProfile {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    images: Vec<ApiImage>,
}

#[derive(Debug, Deserialize)]
struct ApiImage {
    url: String,
}

impl From<ApiFollowedArtistsResponse> for FollowedArtistsPage {
    fn from(response: ApiFollowedArtistsResponse) -> Self {
        let artists = response.artists;
        FollowedArtistsPage {
            items: artists.items,
            next: artists.next,
            total: artists.total,
            after: artists.cursors.and_then(|cursors| cursors.after),
        }
    }
}

impl From<ApiProfile> for UserProfile {
    fn from(profile: ApiProfile) -> Self {
        UserProfile {
            display_name: profile
                .display_name
                .or(profile.id)
                .unwrap_or_else(|| "Unknown listener".to_string()),
            email: profile.email,
            country: profile.country,
            profile_image: profile.images.into_iter().next().map(|image| image.url),
        }
    }
}

#[derive(Clone)]
pub struct SpotifyProvider {
    http_client: HttpClient,
    api_url: String,
    limiter: Arc<RateLimiter>,
}

impl SpotifyProvider {
    pub fn new(api_url: String, limiter: Arc<RateLimiter>) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            limiter,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        token: &AccessToken,
        path: &str,
        query: &[(&str, String)],
    ) -> AppResult<T> {
        let url = format!("{}{}", self.api_url, path);

        let response = self
            .limiter
            .run(
                self.http_client
                    .get(&url)
                    .bearer_auth(token.secret())
                    .query(query)
                    .send(),
            )
            .await?;

        let response = ensure_success(PROVIDER, response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl LibraryProvider for SpotifyProvider {
    async fn fetch_profile(&self, token: &AccessToken) -> AppResult<UserProfile> {
        let profile: ApiProfile = self.get_json(token, "/me", &[]).await?;
        Ok(profile.into())
    }

    async fn fetch_liked_tracks_page(
        &self,
        token: &AccessToken,
        offset: u32,
        limit: u32,
    ) -> AppResult<LikedTracksPage> {
        let limit = limit.clamp(1, MAX_PAGE_LIMIT);
        let page: LikedTracksPage = self
            .get_json(
                token,
                "/me/tracks",
                &[("limit", limit.to_string()), ("offset", offset.to_string())],
            )
            .await?;

        tracing::debug!(
            offset = offset,
            items = page.items.len(),
            total = ?page.total,
            provider = PROVIDER,
            "Liked tracks page fetched"
        );

        Ok(page)
    }

    async fn fetch_followed_artists_page(
        &self,
        token: &AccessToken,
        after: Option<String>,
    ) -> AppResult<FollowedArtistsPage> {
        let mut query = vec![
            ("type", "artist".to_string()),
            ("limit", MAX_PAGE_LIMIT.to_string()),
        ];
        if let Some(after) = after {
            query.push(("after", after));
        }

        let response: ApiFollowedArtistsResponse =
            self.get_json(token, "/me/following", &query).await?;
        Ok(response.into())
    }

    async fn fetch_top_artists(
        &self,
        token: &AccessToken,
        limit: u32,
        time_range: TimeRange,
    ) -> AppResult<TopArtistsPage> {
        self.get_json(
            token,
            "/me/top/artists",
            &[
                ("limit", limit.clamp(1, MAX_PAGE_LIMIT).to_string()),
                ("time_range", time_range.as_str().to_string()),
            ],
        )
        .await
    }

    async fn fetch_artist_details_batch(
        &self,
        token: &AccessToken,
        ids: Vec<String>,
    ) -> AppResult<ArtistsBatch> {
        let ids: Vec<String> = ids
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .take(MAX_ARTIST_BATCH)
            .collect();

        if ids.is_empty() {
            return Ok(ArtistsBatch::default());
        }

        let response: ApiArtistsResponse = self
            .get_json(token, "/artists", &[("ids", ids.join(","))])
            .await?;

        Ok(ArtistsBatch {
            artists: response.artists.into_iter().flatten().collect(),
        })
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}
