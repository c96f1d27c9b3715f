use std::collections::HashSet;

use crate::models::CatalogRecording;

/// Separator between the artist and title halves of a pair key
pub const PAIR_SEPARATOR: &str = "::";

/// Lower-cases and folds every whitespace run into a single underscore.
///
/// Used for artist names, track titles and genre labels alike, so encoded,
/// decoded and compared forms agree.
pub fn normalize(value: &str) -> String {
    value
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Artist+title identity key, also used as the MRID of a shown recommendation
pub fn pair_key(artist: &str, title: &str) -> String {
    format!("{}{}{}", normalize(artist), PAIR_SEPARATOR, normalize(title))
}

/// Rebuilds a client-supplied MRID as a pair key.
///
/// Returns `None` unless both halves around the separator are non-blank.
pub fn canonical_mrid(raw: &str) -> Option<String> {
    let (artist, title) = raw.split_once(PAIR_SEPARATOR)?;
    if artist.trim().is_empty() || title.trim().is_empty() {
        return None;
    }
    Some(pair_key(artist, title))
}

/// Both dedupe keys of a catalog recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackIdentity {
    /// First of ISRC, release barcode, record ID; lower-cased
    pub identifier: Option<String>,
    pub pair: Option<String>,
}

impl TrackIdentity {
    pub fn of(recording: &CatalogRecording) -> Self {
        let identifier = recording
            .isrc()
            .or_else(|| recording.barcode())
            .or(recording.id.as_deref())
            .filter(|id| !id.is_empty())
            .map(str::to_lowercase);

        let pair = match (recording.primary_artist(), recording.title()) {
            (Some(artist), Some(title)) => Some(pair_key(artist, title)),
            _ => None,
        };

        Self { identifier, pair }
    }
}

/// Set of tracks the user must not be shown, matched on either key
#[derive(Debug, Clone, Default)]
pub struct KnownTracks {
    identifiers: HashSet<String>,
    pairs: HashSet<String>,
}

impl KnownTracks {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when either key of `identity` is already known
    pub fn contains(&self, identity: &TrackIdentity) -> bool {
        identity
            .identifier
            .as_ref()
            .is_some_and(|id| self.identifiers.contains(id))
            || identity
                .pair
                .as_ref()
                .is_some_and(|pair| self.pairs.contains(pair))
    }

    pub fn insert(&mut self, identity: &TrackIdentity) {
        if let Some(id) = &identity.identifier {
            self.identifiers.insert(id.clone());
        }
        if let Some(pair) = &identity.pair {
            self.pairs.insert(pair.clone());
        }
    }

    pub fn insert_pair(&mut self, artist: &str, title: &str) {
        self.pairs.insert(pair_key(artist, title));
    }

    /// Adds an already-built pair key (an MRID) as-is
    pub fn insert_mrid(&mut self, mrid: impl Into<String>) {
        self.pairs.insert(mrid.into());
    }

    pub fn contains_pair(&self, pair: &str) -> bool {
        self.pairs.contains(pair)
    }

    pub fn len(&self) -> usize {
        self.identifiers.len() + self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty() && self.pairs.is_empty()
    }
}
