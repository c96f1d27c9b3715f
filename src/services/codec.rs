//! Persisted fingerprint format.
//!
//! Every stored document carries a top-level `version`:
//!
//! * `1` keeps artists and liked tracks as structured records.
//! * `2` (written today) packs them into compact strings:
//!   artists as `name::[genre1,genre2]` with an optional `::top` flag,
//!   liked tracks as `artist::title` with an optional `::added_at`.
//!
//! Each field of a packed string is normalized and then percent-encoded, so a
//! literal `::`, `,`, `[` or `]` inside a name never reaches the delimiters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    models::{Fingerprint, GenreScore, LikedTrack, Taste, TasteArtist, UserProfile},
    services::identity::normalize,
};

pub const CURRENT_VERSION: u32 = 2;

const DELIMITER: &str = "::";
const TOP_FLAG: &str = "top";

#[derive(Debug, Serialize, Deserialize)]
struct PackedFingerprint {
    version: u32,
    generated_at: DateTime<Utc>,
    user: UserProfile,
    taste: PackedTaste,
    #[serde(default)]
    seen_recommendations: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PackedTaste {
    artists: Vec<String>,
    liked_tracks: Vec<String>,
    genres: Vec<GenreScore>,
}

fn escape(value: &str) -> String {
    urlencoding::encode(&normalize(value)).into_owned()
}

fn unescape(field: &str, entry: &str) -> AppResult<String> {
    urlencoding::decode(field)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| incompatible(format!("undecodable field in entry \"{}\"", entry)))
}

fn incompatible(message: String) -> AppError {
    AppError::IncompatibleFormat(message)
}

/// Packs an artist as `name::[genre1,genre2]` plus `::top` for top artists
pub fn encode_artist(artist: &TasteArtist) -> String {
    let genres: Vec<String> = artist.genres.iter().map(|genre| escape(genre)).collect();
    let mut encoded = format!("{}{}[{}]", escape(&artist.name), DELIMITER, genres.join(","));
    if artist.is_top_artist {
        encoded.push_str(DELIMITER);
        encoded.push_str(TOP_FLAG);
    }
    encoded
}

/// Unpacks an artist entry.
///
/// A missing name or genre list rejects the entry. An unrecognized trailing
/// flag is dropped.
pub fn decode_artist(entry: &str) -> AppResult<TasteArtist> {
    let parts: Vec<&str> = entry.split(DELIMITER).collect();
    if parts.len() < 2 || parts[0].is_empty() {
        return Err(incompatible(format!(
            "expected \"name::[genres]\" but got \"{}\"",
            entry
        )));
    }

    let genre_list = parts[1]
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| {
            incompatible(format!("expected \"[...]\" genre list but got \"{}\"", parts[1]))
        })?;

    let genres = genre_list
        .split(',')
        .filter(|genre| !genre.is_empty())
        .map(|genre| unescape(genre, entry))
        .collect::<AppResult<Vec<_>>>()?;

    let is_top_artist = match parts.get(2) {
        None => false,
        Some(&TOP_FLAG) => true,
        Some(flag) => {
            tracing::warn!(entry = %entry, flag = %flag, "Ignoring unknown artist flag");
            false
        }
    };

    Ok(TasteArtist {
        id: None,
        name: unescape(parts[0], entry)?,
        genres,
        is_top_artist,
    })
}

/// Packs a liked track as `artist::title` plus `::added_at` when known
pub fn encode_track(track: &LikedTrack) -> String {
    let mut encoded = format!("{}{}{}", escape(&track.artist), DELIMITER, escape(&track.name));
    if let Some(added_at) = &track.added_at {
        encoded.push_str(DELIMITER);
        encoded.push_str(&urlencoding::encode(added_at));
    }
    encoded
}

/// Unpacks a liked track entry.
///
/// A missing title rejects the entry. A timestamp that does not parse is
/// dropped and the track kept.
pub fn decode_track(entry: &str) -> AppResult<LikedTrack> {
    let parts: Vec<&str> = entry.split(DELIMITER).collect();
    if parts.len() < 2 || parts[1].is_empty() {
        return Err(incompatible(format!(
            "expected \"artist::track\" but got \"{}\"",
            entry
        )));
    }

    let added_at = parts.get(2).and_then(|raw| {
        let stamp = urlencoding::decode(raw).ok()?.into_owned();
        if DateTime::parse_from_rfc3339(&stamp).is_ok() {
            Some(stamp)
        } else {
            tracing::warn!(entry = %entry, "Dropping unparsable liked-track timestamp");
            None
        }
    });

    Ok(LikedTrack {
        id: None,
        artist: unescape(parts[0], entry)?,
        name: unescape(parts[1], entry)?,
        added_at,
    })
}

/// Serializes a fingerprint in the current persisted format
pub fn encode(fingerprint: &Fingerprint) -> AppResult<String> {
    let packed = PackedFingerprint {
        version: CURRENT_VERSION,
        generated_at: fingerprint.generated_at,
        user: fingerprint.user.clone(),
        taste: PackedTaste {
            artists: fingerprint.taste.artists.iter().map(encode_artist).collect(),
            liked_tracks: fingerprint.taste.liked_tracks.iter().map(encode_track).collect(),
            genres: fingerprint.taste.genres.clone(),
        },
        seen_recommendations: fingerprint.seen_recommendations.clone(),
    };

    serde_json::to_string(&packed)
        .map_err(|e| AppError::Internal(format!("Fingerprint serialization error: {}", e)))
}

/// Reads a persisted fingerprint of any supported version
pub fn decode(raw: &str) -> AppResult<Fingerprint> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| incompatible(format!("stored fingerprint is not JSON: {}", e)))?;

    let version = value
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| incompatible("stored fingerprint has no version".to_string()))?;

    match version {
        1 => serde_json::from_value::<Fingerprint>(value)
            .map_err(|e| incompatible(format!("version 1 fingerprint: {}", e))),
        2 => {
            let packed = serde_json::from_value::<PackedFingerprint>(value)
                .map_err(|e| incompatible(format!("version 2 fingerprint: {}", e)))?;
            unpack(packed)
        }
        other => Err(incompatible(format!("unknown fingerprint version {}", other))),
    }
}

fn unpack(packed: PackedFingerprint) -> AppResult<Fingerprint> {
    let artists = packed
        .taste
        .artists
        .iter()
        .map(|entry| decode_artist(entry))
        .collect::<AppResult<Vec<_>>>()?;

    let liked_tracks = packed
        .taste
        .liked_tracks
        .iter()
        .map(|entry| decode_track(entry))
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Fingerprint {
        version: packed.version,
        generated_at: packed.generated_at,
        user: packed.user,
        taste: Taste {
            artists,
            liked_tracks,
            genres: packed.taste.genres,
        },
        seen_recommendations: packed.seen_recommendations,
    })
}
