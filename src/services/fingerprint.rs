use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::{
    error::AppResult,
    models::{
        AccessToken, ArtistDetails, Fingerprint, GenreScore, LikedTrack, Taste, TasteArtist,
        TimeRange,
    },
    services::{
        codec::CURRENT_VERSION,
        identity::normalize,
        progress::{page_ratio, ProgressStage, ProgressTracker},
        providers::{LibraryProvider, MAX_ARTIST_BATCH},
        recency::{recency_weight, Clock},
    },
};

/// Flat weight added for each followed artist
pub const FOLLOW_WEIGHT: f64 = 0.5;

/// Weight assumed for a resolved artist that no signal weighted
pub const DEFAULT_ARTIST_WEIGHT: f64 = 1.0;

const LIKED_TRACKS_PAGE_LIMIT: u32 = 50;
const TOP_ARTISTS_LIMIT: u32 = 20;

/// Accumulated weight per artist ID.
///
/// Purely additive, so the order pages arrive in never changes the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtistWeights {
    weights: BTreeMap<String, f64>,
}

impl ArtistWeights {
    pub fn add(&mut self, artist_id: &str, weight: f64) {
        *self.weights.entry(artist_id.to_string()).or_insert(0.0) += weight;
    }

    pub fn get(&self, artist_id: &str) -> Option<f64> {
        self.weights.get(artist_id).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.weights.keys()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Normalized, ranked genre distribution for a set of resolved artists.
///
/// Every artist contributes its whole weight to each of its genres (unweighted
/// artists count as [`DEFAULT_ARTIST_WEIGHT`]). Scores are divided by the sum
/// of all contributions so they add up to 1. With no weight at all, every
/// genre gets `1/N`.
pub fn genre_distribution(artists: &[ArtistDetails], weights: &ArtistWeights) -> Vec<GenreScore> {
    let mut contributions: BTreeMap<String, f64> = BTreeMap::new();

    for artist in artists {
        let weight = weights.get(&artist.id).unwrap_or(DEFAULT_ARTIST_WEIGHT);
        let genres: BTreeSet<String> = artist
            .genres
            .iter()
            .map(|genre| normalize(genre))
            .filter(|genre| !genre.is_empty())
            .collect();

        for genre in genres {
            *contributions.entry(genre).or_insert(0.0) += weight;
        }
    }

    if contributions.is_empty() {
        return Vec::new();
    }

    let total: f64 = contributions.values().sum();
    let uniform = 1.0 / contributions.len() as f64;

    let mut genres: Vec<GenreScore> = contributions
        .into_iter()
        .map(|(name, weight)| {
            let score = if total > 0.0 { weight / total } else { uniform };
            GenreScore::new(name, score)
        })
        .collect();

    genres.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    genres
}

/// Builds a fingerprint from the user's library signals.
///
/// Stages run strictly one after another and every page is awaited before
/// the next is requested. Liked tracks, followed artists and artist details
/// are load-bearing: any failure aborts the build. A failed top-artists
/// request only loses the top-artist flags.
pub struct FingerprintBuilder<'a> {
    provider: &'a dyn LibraryProvider,
    token: &'a AccessToken,
    now: DateTime<Utc>,
}

impl<'a> FingerprintBuilder<'a> {
    pub fn new(provider: &'a dyn LibraryProvider, token: &'a AccessToken, clock: &dyn Clock) -> Self {
        Self {
            provider,
            token,
            now: clock.now(),
        }
    }

    pub async fn build(&self, progress: &mut ProgressTracker) -> AppResult<Fingerprint> {
        tracing::info!(provider = self.provider.name(), "Building fingerprint");

        let user = self.provider.fetch_profile(self.token).await?;

        let mut weights = ArtistWeights::default();
        let liked_tracks = self.collect_liked_tracks(&mut weights, progress).await?;
        self.collect_followed_artists(&mut weights, progress).await?;
        let top_artists = self.collect_top_artists(progress).await;
        let (artists, genres) = self.resolve_artists(&weights, &top_artists, progress).await?;

        tracing::info!(
            liked_tracks = liked_tracks.len(),
            artists = artists.len(),
            genres = genres.len(),
            "Fingerprint built"
        );

        Ok(Fingerprint {
            version: CURRENT_VERSION,
            generated_at: self.now,
            user,
            taste: Taste {
                artists,
                liked_tracks,
                genres,
            },
            seen_recommendations: Vec::new(),
        })
    }

    async fn collect_liked_tracks(
        &self,
        weights: &mut ArtistWeights,
        progress: &mut ProgressTracker,
    ) -> AppResult<Vec<LikedTrack>> {
        let stage = ProgressStage::LikedTracks;
        progress.report(stage, 0.0, "Fetching liked tracks…");

        let mut liked_tracks = Vec::new();
        let mut offset: u32 = 0;
        let mut total = None;

        loop {
            let page = self
                .provider
                .fetch_liked_tracks_page(self.token, offset, LIKED_TRACKS_PAGE_LIMIT)
                .await?;

            total = page.total.or(total);
            let fetched = page.items.len();

            for item in page.items {
                let Some(track) = item.track else { continue };
                let Some(track_id) = track.id.filter(|id| !id.is_empty()) else {
                    continue;
                };

                let weight = recency_weight(item.added_at.as_deref(), self.now);
                for artist in &track.artists {
                    if let Some(artist_id) = artist.id.as_deref().filter(|id| !id.is_empty()) {
                        weights.add(artist_id, weight);
                    }
                }

                liked_tracks.push(LikedTrack {
                    id: Some(track_id),
                    artist: track
                        .artists
                        .first()
                        .map(|artist| artist.name.clone())
                        .unwrap_or_default(),
                    name: track.name,
                    added_at: item.added_at,
                });
            }

            offset += fetched as u32;
            progress.report(
                stage,
                page_ratio(offset as usize, total),
                format!("Fetched {} liked tracks", offset),
            );

            if page.next.is_none() || fetched == 0 {
                break;
            }
        }

        progress.report(stage, 1.0, format!("Fetched {} liked tracks", offset));
        Ok(liked_tracks)
    }

    async fn collect_followed_artists(
        &self,
        weights: &mut ArtistWeights,
        progress: &mut ProgressTracker,
    ) -> AppResult<()> {
        let stage = ProgressStage::FollowedArtists;
        progress.report(stage, 0.0, "Fetching followed artists…");

        let mut after = None;
        let mut processed = 0usize;
        let mut total = None;

        loop {
            let page = self
                .provider
                .fetch_followed_artists_page(self.token, after.take())
                .await?;

            total = page.total.or(total);

            for artist in &page.items {
                if !artist.id.is_empty() {
                    weights.add(&artist.id, FOLLOW_WEIGHT);
                }
            }

            processed += page.items.len();
            progress.report(
                stage,
                page_ratio(processed, total),
                format!("Fetched {} followed artists", processed),
            );

            match (page.next, page.after) {
                (Some(_), Some(cursor)) if !page.items.is_empty() => after = Some(cursor),
                _ => break,
            }
        }

        progress.report(stage, 1.0, format!("Fetched {} followed artists", processed));
        Ok(())
    }

    async fn collect_top_artists(&self, progress: &mut ProgressTracker) -> HashSet<String> {
        let stage = ProgressStage::TopArtists;
        progress.report(stage, 0.0, "Fetching top artists…");

        match self
            .provider
            .fetch_top_artists(self.token, TOP_ARTISTS_LIMIT, TimeRange::MediumTerm)
            .await
        {
            Ok(page) => {
                let top: HashSet<String> = page
                    .items
                    .into_iter()
                    .map(|artist| artist.id)
                    .filter(|id| !id.is_empty())
                    .collect();
                progress.report(stage, 1.0, format!("Fetched {} top artists", top.len()));
                top
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch top artists, continuing without them");
                progress.report(stage, 1.0, "Top artists unavailable");
                HashSet::new()
            }
        }
    }

    async fn resolve_artists(
        &self,
        weights: &ArtistWeights,
        top_artists: &HashSet<String>,
        progress: &mut ProgressTracker,
    ) -> AppResult<(Vec<TasteArtist>, Vec<GenreScore>)> {
        let stage = ProgressStage::ArtistDetails;
        progress.report(stage, 0.0, "Resolving artist details…");

        let ids: Vec<String> = weights.ids().cloned().collect();
        let mut resolved: Vec<ArtistDetails> = Vec::with_capacity(ids.len());
        let mut processed = 0usize;

        for chunk in ids.chunks(MAX_ARTIST_BATCH) {
            let batch = self
                .provider
                .fetch_artist_details_batch(self.token, chunk.to_vec())
                .await?;
            resolved.extend(batch.artists);

            processed += chunk.len();
            progress.report(
                stage,
                processed as f64 / ids.len() as f64,
                format!("Resolved {} of {} artists", processed, ids.len()),
            );
        }

        let genres = genre_distribution(&resolved, weights);
        let artists = resolved
            .into_iter()
            .map(|artist| TasteArtist {
                is_top_artist: top_artists.contains(&artist.id),
                genres: artist.genres.iter().map(|genre| normalize(genre)).collect(),
                id: Some(artist.id),
                name: artist.name,
            })
            .collect();

        progress.report(stage, 1.0, "Artist details fetched successfully.");
        Ok((artists, genres))
    }
}
