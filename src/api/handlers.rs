use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt};

use crate::error::{AppError, AppResult};
use crate::models::{AccessToken, DedupeCache, Fingerprint, Recommendation, SeenKind};
use crate::services::identity::canonical_mrid;
use crate::services::{FingerprintBuilder, ProgressTracker, ProgressUpdate};

use super::AppState;

const NDJSON: &str = "application/x-ndjson";

// Request/Response types

#[derive(Debug, Default, Deserialize)]
pub struct FingerprintQuery {
    /// Rebuild even if a fingerprint is already stored
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Deserialize)]
pub struct MarkSeenRequest {
    pub mrids: Vec<String>,
    /// Record under the no-video set instead of the displayed set
    #[serde(default)]
    pub no_video: bool,
}

/// One line of the fingerprint stream
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Progress(ProgressUpdate),
    Complete { cached: bool, data: Fingerprint },
    Error { error: String },
}

impl StreamEvent {
    fn to_line(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|e| {
            json!({ "type": "error", "error": format!("Serialization error: {}", e) }).to_string()
        });
        line.push('\n');
        line
    }
}

fn bearer_token(headers: &HeaderMap) -> AppResult<AccessToken> {
    AccessToken::from_authorization(
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok()),
    )
}

// Handlers

pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Streams fingerprint generation progress as NDJSON
///
/// The credential is checked before the stream opens, so a missing token is
/// a plain 401. Every later failure arrives as an `error` line.
pub async fn generate_fingerprint(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<FingerprintQuery>,
) -> AppResult<Response> {
    let token = bearer_token(&headers)?;
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    tokio::spawn(run_fingerprint_job(state, token, query.force, events_tx));

    let lines = UnboundedReceiverStream::new(events_rx)
        .map(|event: StreamEvent| Ok::<_, Infallible>(event.to_line()));

    Ok(([(header::CONTENT_TYPE, NDJSON)], Body::from_stream(lines)).into_response())
}

async fn run_fingerprint_job(
    state: AppState,
    token: AccessToken,
    force: bool,
    events: mpsc::UnboundedSender<StreamEvent>,
) {
    let session = token.session_id();

    if !force {
        match state.store.load_fingerprint(&session).await {
            Ok(Some(fingerprint)) => {
                tracing::info!(session = %session, "Serving stored fingerprint");
                let _ = events.send(StreamEvent::Complete {
                    cached: true,
                    data: fingerprint,
                });
                return;
            }
            Ok(None) => {}
            Err(AppError::IncompatibleFormat(reason)) => {
                tracing::warn!(session = %session, reason = %reason, "Stored fingerprint unreadable, regenerating");
            }
            Err(e) => {
                let _ = events.send(StreamEvent::Error {
                    error: e.to_string(),
                });
                return;
            }
        }
    }

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let forward_events = events.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(update) = progress_rx.recv().await {
            if forward_events.send(StreamEvent::Progress(update)).is_err() {
                break;
            }
        }
    });

    let mut tracker = ProgressTracker::new(progress_tx);
    let builder = FingerprintBuilder::new(state.library.as_ref(), &token, state.clock.as_ref());

    let built = match builder.build(&mut tracker).await {
        Ok(fingerprint) => state
            .store
            .save_fingerprint(&session, &fingerprint)
            .await
            .map(|_| fingerprint),
        Err(e) => Err(e),
    };

    if built.is_ok() {
        tracker.complete("Fingerprint ready");
    }
    // Flush every progress line before the terminal event
    drop(tracker);
    let _ = forwarder.await;

    let event = match built {
        Ok(fingerprint) => StreamEvent::Complete {
            cached: false,
            data: fingerprint,
        },
        Err(e) => {
            tracing::error!(session = %session, error = %e, "Fingerprint generation failed");
            StreamEvent::Error {
                error: e.to_string(),
            }
        }
    };
    let _ = events.send(event);
}

pub async fn get_fingerprint(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Fingerprint>> {
    let session = bearer_token(&headers)?.session_id();

    state
        .store
        .load_fingerprint(&session)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No fingerprint stored for this session".to_string()))
}

pub async fn recommendations(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<RecommendationsResponse>> {
    let session = bearer_token(&headers)?.session_id();

    let fingerprint = state.store.load_fingerprint(&session).await?;
    let seen = state.store.load_dedupe(&session).await?;

    let mut rng = StdRng::from_entropy();
    let recommendations = state
        .engine
        .generate(fingerprint.as_ref(), &seen, &mut rng)
        .await?;

    let mut shown = DedupeCache::default();
    for recommendation in &recommendations {
        shown.insert(SeenKind::Displayed, recommendation.mrid.clone());
    }
    state.store.merge_dedupe(&session, &shown).await?;

    Ok(Json(RecommendationsResponse { recommendations }))
}

pub async fn mark_seen(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<MarkSeenRequest>,
) -> AppResult<StatusCode> {
    let session = bearer_token(&headers)?.session_id();

    let kind = if request.no_video {
        SeenKind::NoVideo
    } else {
        SeenKind::Displayed
    };

    let mut additions = DedupeCache::default();
    for raw in request.mrids {
        if raw.trim().is_empty() {
            continue;
        }
        let mrid = canonical_mrid(&raw)
            .ok_or_else(|| AppError::InvalidInput(format!("Malformed MRID: {}", raw)))?;
        additions.insert(kind, mrid);
    }

    if !additions.is_empty() {
        state.store.merge_dedupe(&session, &additions).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}
