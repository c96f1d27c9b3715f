//! MusicBrainz recording search, used as the discovery catalog
//!
//! Genres arrive normalized (`indie_rock`); MusicBrainz tags use spaces, so
//! the label is turned back into a tag query before searching.

use crate::{
    error::AppResult,
    models::CatalogPage,
    services::{
        providers::{ensure_success, CatalogProvider},
        rate_limiter::RateLimiter,
    },
};
use reqwest::Client as HttpClient;
use std::sync::Arc;

const PROVIDER: &str = "musicbrainz";
const MAX_SEARCH_LIMIT: u32 = 100;

#[derive(Clone)]
pub struct MusicBrainzProvider {
    http_client: HttpClient,
    api_url: String,
    user_agent: String,
    limiter: Arc<RateLimiter>,
}

impl MusicBrainzProvider {
    pub fn new(api_url: String, user_agent: String, limiter: Arc<RateLimiter>) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            user_agent,
            limiter,
        }
    }
}

/// Lucene query matching recordings tagged with `genre`
fn tag_query(genre: &str) -> String {
    let tag = genre.replace('_', " ").replace('"', "");
    format!("tag:\"{}\"", tag.trim())
}

#[async_trait::async_trait]
impl CatalogProvider for MusicBrainzProvider {
    async fn fetch_catalog_page(
        &self,
        genre: &str,
        limit: u32,
        offset: u32,
    ) -> AppResult<CatalogPage> {
        let url = format!("{}/recording", self.api_url);
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);

        let response = self
            .limiter
            .run(
                self.http_client
                    .get(&url)
                    .header(reqwest::header::USER_AGENT, &self.user_agent)
                    .query(&[
                        ("query", tag_query(genre)),
                        ("limit", limit.to_string()),
                        ("offset", offset.to_string()),
                        ("fmt", "json".to_string()),
                    ])
                    .send(),
            )
            .await?;

        let response = ensure_success(PROVIDER, response).await?;
        let page: CatalogPage = response.json().await?;

        tracing::info!(
            genre = %genre,
            offset = offset,
            results = page.recordings.len(),
            provider = PROVIDER,
            "Catalog page fetched"
        );

        Ok(page)
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}
