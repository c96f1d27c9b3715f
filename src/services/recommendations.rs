use crate::{
    error::{AppError, AppResult},
    models::{DedupeCache, Fingerprint, Recommendation},
    services::{
        identity::{pair_key, KnownTracks},
        pool::{Candidate, CandidatePools},
        providers::CatalogProvider,
        sampler::GenreSampler,
    },
};
use rand::Rng;
use std::sync::Arc;

const UNKNOWN_TITLE: &str = "Unknown title";
const UNKNOWN_ARTIST: &str = "Unknown artist";

/// Bounds shared by the candidate pools and the assembler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Recommendations returned per run
    pub target_recommendations: usize,
    /// Genres drawn per run
    pub genre_batch_size: usize,
    /// Pool size a genre is topped up to before taking from it
    pub min_genre_pool: usize,
    /// Catalog page size
    pub discover_limit: u32,
    /// Replenishment attempts per fill, and fill cycles per take
    pub max_pool_attempts: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            target_recommendations: 10,
            genre_batch_size: 10,
            min_genre_pool: 5,
            discover_limit: 10,
            max_pool_attempts: 5,
        }
    }
}

/// Turns a fingerprint into a batch of unseen catalog recordings
pub struct RecommendationEngine {
    catalog: Arc<dyn CatalogProvider>,
    settings: EngineSettings,
}

impl RecommendationEngine {
    pub fn new(catalog: Arc<dyn CatalogProvider>, settings: EngineSettings) -> Self {
        Self { catalog, settings }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Draws the genres for one run
    pub fn draw_genres<R: Rng + ?Sized>(
        &self,
        fingerprint: Option<&Fingerprint>,
        rng: &mut R,
    ) -> AppResult<Vec<String>> {
        let fingerprint = fingerprint.ok_or(AppError::MissingFingerprint)?;
        let sampler = GenreSampler::new(&fingerprint.taste.genres).ok_or(AppError::EmptyTaste)?;

        Ok(sampler.sample(self.settings.genre_batch_size, rng))
    }

    /// Samples genres and assembles recommendations for them
    pub async fn generate<R: Rng + ?Sized>(
        &self,
        fingerprint: Option<&Fingerprint>,
        seen: &DedupeCache,
        rng: &mut R,
    ) -> AppResult<Vec<Recommendation>> {
        let genres = self.draw_genres(fingerprint, rng)?;
        let fingerprint = fingerprint.ok_or(AppError::MissingFingerprint)?;

        Ok(self.assemble(fingerprint, seen, &genres).await)
    }

    /// Takes at most one candidate per drawn genre, in draw order, until the
    /// target is reached. Genres whose pool runs dry are skipped.
    pub async fn assemble(
        &self,
        fingerprint: &Fingerprint,
        seen: &DedupeCache,
        genres: &[String],
    ) -> Vec<Recommendation> {
        let mut known = known_tracks(fingerprint, seen);
        let mut pools = CandidatePools::new(self.catalog.as_ref(), self.settings);
        let mut recommendations = Vec::with_capacity(self.settings.target_recommendations);

        tracing::info!(
            genres = genres.len(),
            known = known.len(),
            provider = self.catalog.name(),
            "Assembling recommendations"
        );

        for genre in genres {
            if recommendations.len() >= self.settings.target_recommendations {
                break;
            }

            let Some(candidate) = pools.take(genre, &known).await else {
                tracing::debug!(genre = %genre, "Skipping genre without candidates");
                continue;
            };

            known.insert(&candidate.identity);
            recommendations.push(to_recommendation(candidate, genre));
        }

        tracing::info!(
            count = recommendations.len(),
            target = self.settings.target_recommendations,
            "Recommendations assembled"
        );

        recommendations
    }
}

/// Liked tracks plus every MRID already shown or flagged for this user
pub fn known_tracks(fingerprint: &Fingerprint, seen: &DedupeCache) -> KnownTracks {
    let mut known = KnownTracks::new();

    for track in &fingerprint.taste.liked_tracks {
        if track.artist.is_empty() || track.name.is_empty() {
            continue;
        }
        known.insert_pair(&track.artist, &track.name);
    }

    for mrid in fingerprint.seen_recommendations.iter().chain(seen.all()) {
        known.insert_mrid(mrid.clone());
    }

    known
}

fn to_recommendation(candidate: Candidate, genre: &str) -> Recommendation {
    let recording = candidate.recording;
    let title = recording.title().unwrap_or(UNKNOWN_TITLE).to_string();
    let artist = recording.primary_artist().unwrap_or(UNKNOWN_ARTIST).to_string();
    let mrid = candidate
        .identity
        .pair
        .unwrap_or_else(|| pair_key(&artist, &title));

    Recommendation {
        isrc: recording.isrc().map(str::to_string),
        mbid: recording.id,
        title,
        artist,
        genre: genre.to_string(),
        mrid,
    }
}
