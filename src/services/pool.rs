use std::collections::{HashMap, VecDeque};

use crate::{
    error::AppResult,
    models::CatalogRecording,
    services::{
        identity::{KnownTracks, TrackIdentity},
        providers::CatalogProvider,
        recommendations::EngineSettings,
    },
};

/// A pooled recording together with its dedupe keys
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub recording: CatalogRecording,
    pub identity: TrackIdentity,
}

#[derive(Debug, Default)]
struct GenrePool {
    queue: VecDeque<Candidate>,
    /// Everything ever admitted to this genre's queue during the run
    admitted: KnownTracks,
    next_offset: u32,
    exhausted: bool,
}

/// Per-genre buffers of catalog recordings the user has not seen.
///
/// Scoped to one recommendation run and never shared between runs. Catalog
/// pages are requested one at a time.
pub struct CandidatePools<'a> {
    catalog: &'a dyn CatalogProvider,
    settings: EngineSettings,
    pools: HashMap<String, GenrePool>,
}

impl<'a> CandidatePools<'a> {
    pub fn new(catalog: &'a dyn CatalogProvider, settings: EngineSettings) -> Self {
        Self {
            catalog,
            settings,
            pools: HashMap::new(),
        }
    }

    /// Number of recordings currently buffered for `genre`
    pub fn pooled(&self, genre: &str) -> usize {
        self.pools.get(genre).map_or(0, |pool| pool.queue.len())
    }

    /// Tops up the pool for `genre` until it holds `min_genre_pool`
    /// recordings, the attempt budget is spent, or the catalog runs dry.
    ///
    /// Recordings without a title, already `known`, or already pooled for
    /// this genre are skipped.
    pub async fn ensure(&mut self, genre: &str, known: &KnownTracks) -> AppResult<()> {
        let catalog = self.catalog;
        let settings = self.settings;
        let pool = self.pools.entry(genre.to_string()).or_default();

        let mut attempts = 0;
        while attempts < settings.max_pool_attempts
            && pool.queue.len() < settings.min_genre_pool
            && !pool.exhausted
        {
            let page = catalog
                .fetch_catalog_page(genre, settings.discover_limit, pool.next_offset)
                .await?;
            attempts += 1;

            let fetched = page.recordings.len();
            let mut admitted = 0;

            for recording in page.recordings {
                if recording.title().is_none() {
                    continue;
                }

                let identity = TrackIdentity::of(&recording);
                if known.contains(&identity) || pool.admitted.contains(&identity) {
                    continue;
                }

                pool.admitted.insert(&identity);
                pool.queue.push_back(Candidate {
                    recording,
                    identity,
                });
                admitted += 1;
            }

            pool.next_offset += fetched as u32;

            tracing::debug!(
                genre = %genre,
                attempt = attempts,
                fetched = fetched,
                admitted = admitted,
                pooled = pool.queue.len(),
                "Genre pool replenished"
            );

            if fetched == 0 {
                pool.exhausted = true;
            }
        }

        Ok(())
    }

    /// Pops the next recording for `genre` that is still unknown.
    ///
    /// `known` may have grown since the pool was filled, so every popped
    /// recording is checked again. Returns `None` once `max_pool_attempts`
    /// replenishment cycles produce nothing; a failing catalog request ends
    /// the search for this genre only.
    pub async fn take(&mut self, genre: &str, known: &KnownTracks) -> Option<Candidate> {
        for cycle in 0..self.settings.max_pool_attempts {
            let replenished = self.ensure(genre, known).await;
            if let Err(e) = &replenished {
                tracing::warn!(genre = %genre, cycle = cycle, error = %e, "Genre pool replenishment failed");
            }

            let pool = self.pools.get_mut(genre)?;
            while let Some(candidate) = pool.queue.pop_front() {
                if known.contains(&candidate.identity) {
                    continue;
                }
                return Some(candidate);
            }

            if replenished.is_err() || pool.exhausted {
                break;
            }
        }

        tracing::debug!(genre = %genre, "No candidate left for genre");
        None
    }
}
