//! Upstream data providers
//!
//! The taste engine only ever talks to these two seams: the user's streaming
//! library (likes, follows, top artists, artist genres) and the public music
//! catalog used for discovery. HTTP implementations live in the submodules;
//! tests swap in mocks or stubs.

use crate::{
    error::AppResult,
    models::{
        AccessToken, ArtistsBatch, CatalogPage, FollowedArtistsPage, LikedTracksPage,
        TimeRange, TopArtistsPage, UserProfile,
    },
};

pub mod musicbrainz;
pub mod spotify;

pub use musicbrainz::MusicBrainzProvider;
pub use spotify::SpotifyProvider;

/// Upstream batch limit for artist detail lookups
pub const MAX_ARTIST_BATCH: usize = 50;

/// Trait for the user's streaming library
///
/// Every call is made on behalf of the user holding `token`. Implementations
/// return already-parsed pages; pagination is driven by the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LibraryProvider: Send + Sync {
    /// Fetch the profile snapshot stored alongside the fingerprint
    async fn fetch_profile(&self, token: &AccessToken) -> AppResult<UserProfile>;

    /// Fetch one offset-paginated page of saved tracks
    async fn fetch_liked_tracks_page(
        &self,
        token: &AccessToken,
        offset: u32,
        limit: u32,
    ) -> AppResult<LikedTracksPage>;

    /// Fetch one cursor-paginated page of followed artists
    async fn fetch_followed_artists_page(
        &self,
        token: &AccessToken,
        after: Option<String>,
    ) -> AppResult<FollowedArtistsPage>;

    /// Fetch the user's top artists in a single bounded request
    async fn fetch_top_artists(
        &self,
        token: &AccessToken,
        limit: u32,
        time_range: TimeRange,
    ) -> AppResult<TopArtistsPage>;

    /// Resolve up to [`MAX_ARTIST_BATCH`] artist IDs to their details
    async fn fetch_artist_details_batch(
        &self,
        token: &AccessToken,
        ids: Vec<String>,
    ) -> AppResult<ArtistsBatch>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Trait for the public catalog searched by genre
///
/// Implementations are rate-limited; callers issue one request at a time.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Fetch up to `limit` recordings tagged with `genre`, skipping `offset`
    async fn fetch_catalog_page(
        &self,
        genre: &str,
        limit: u32,
        offset: u32,
    ) -> AppResult<CatalogPage>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Checks an upstream response status and turns failures into
/// [`crate::error::AppError::ExternalApi`] with the upstream's message.
pub(crate) async fn ensure_success(
    provider: &str,
    response: reqwest::Response,
) -> AppResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    tracing::error!(
        provider = provider,
        status = %status,
        body = %body,
        "External API request failed"
    );

    Err(crate::error::AppError::ExternalApi(format!(
        "{} returned status {}: {}",
        provider, status, body
    )))
}
