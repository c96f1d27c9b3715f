use std::sync::Arc;

use crate::db::FingerprintStore;
use crate::services::providers::{CatalogProvider, LibraryProvider};
use crate::services::{Clock, EngineSettings, RecommendationEngine, SystemClock};

/// Shared application state
///
/// Everything is behind `Arc`, so cloning per request is cheap. Rate limiters
/// live inside the providers and are shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub library: Arc<dyn LibraryProvider>,
    pub engine: Arc<RecommendationEngine>,
    pub store: Arc<dyn FingerprintStore>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        library: Arc<dyn LibraryProvider>,
        catalog: Arc<dyn CatalogProvider>,
        store: Arc<dyn FingerprintStore>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            library,
            engine: Arc::new(RecommendationEngine::new(catalog, settings)),
            store,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the wall clock, for deterministic recency weights
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
