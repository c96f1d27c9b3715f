use serde::{Deserialize, Serialize};

pub mod fingerprint;
pub mod recommendation;
pub mod session;

pub use fingerprint::{Fingerprint, GenreScore, LikedTrack, Taste, TasteArtist, UserProfile};
pub use recommendation::{DedupeCache, Recommendation, SeenKind};
pub use session::{AccessToken, SessionId};

// ============================================================================
// Library source (Spotify) page types
// ============================================================================

/// Artist reference embedded in a track
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtistRef {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlbumRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LibraryTrack {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub album: Option<AlbumRef>,
}

/// One saved track in the user's library. `track` is null for tracks that
/// were removed from the service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedTrackItem {
    pub track: Option<LibraryTrack>,
    #[serde(default)]
    pub added_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LikedTracksPage {
    #[serde(default)]
    pub items: Vec<SavedTrackItem>,
    pub next: Option<String>,
    #[serde(default)]
    pub total: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtistSummary {
    pub id: String,
    pub name: String,
}

/// Cursor-paginated page of followed artists
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FollowedArtistsPage {
    pub items: Vec<ArtistSummary>,
    pub next: Option<String>,
    pub total: Option<u32>,
    pub after: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TopArtistsPage {
    #[serde(default)]
    pub items: Vec<ArtistSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtistDetails {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ArtistsBatch {
    pub artists: Vec<ArtistDetails>,
}

/// Time window used for the top-artists signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    ShortTerm,
    MediumTerm,
    LongTerm,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        }
    }
}

// ============================================================================
// Catalog (MusicBrainz) types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtistCredit {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogRelease {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
}

/// A recording returned by the catalog search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogRecording {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "artist-credit", default)]
    pub artist_credit: Vec<ArtistCredit>,
    #[serde(default)]
    pub isrcs: Vec<String>,
    #[serde(default)]
    pub releases: Vec<CatalogRelease>,
}

impl CatalogRecording {
    /// Name of the first credited artist, if any
    pub fn primary_artist(&self) -> Option<&str> {
        self.artist_credit
            .first()
            .and_then(|credit| credit.name.as_deref())
            .filter(|name| !name.trim().is_empty())
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|title| !title.trim().is_empty())
    }

    pub fn isrc(&self) -> Option<&str> {
        self.isrcs.first().map(String::as_str)
    }

    /// First release barcode on the recording. MusicBrainz reports missing
    /// barcodes as empty strings, which are skipped.
    pub fn barcode(&self) -> Option<&str> {
        self.releases
            .iter()
            .filter_map(|release| release.barcode.as_deref())
            .find(|barcode| !barcode.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CatalogPage {
    #[serde(default)]
    pub recordings: Vec<CatalogRecording>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_recording_deserializes_musicbrainz_shape() {
        let json = r#"{
            "id": "b1a9c0e9-d987-4042-ae91-78d6a3267d69",
            "title": "One More Time",
            "artist-credit": [{ "name": "Daft Punk" }],
            "isrcs": ["GBDUW0000053"],
            "releases": [{ "id": "r1", "barcode": "" }, { "id": "r2", "barcode": "724384960650" }]
        }"#;

        let recording: CatalogRecording = serde_json::from_str(json).unwrap();

        assert_eq!(recording.primary_artist(), Some("Daft Punk"));
        assert_eq!(recording.title(), Some("One More Time"));
        assert_eq!(recording.isrc(), Some("GBDUW0000053"));
        assert_eq!(recording.barcode(), Some("724384960650"));
    }

    #[test]
    fn test_catalog_recording_tolerates_missing_fields() {
        let recording: CatalogRecording = serde_json::from_str(r#"{ "id": "x" }"#).unwrap();

        assert_eq!(recording.primary_artist(), None);
        assert_eq!(recording.title(), None);
        assert_eq!(recording.barcode(), None);
    }

    #[test]
    fn test_saved_track_with_null_track() {
        let page: LikedTracksPage = serde_json::from_str(
            r#"{ "items": [{ "track": null, "added_at": "2024-01-01T00:00:00Z" }], "next": null, "total": 1 }"#,
        )
        .unwrap();

        assert_eq!(page.items.len(), 1);
        assert!(page.items[0].track.is_none());
        assert_eq!(page.total, Some(1));
    }

    #[test]
    fn test_time_range_as_str() {
        assert_eq!(TimeRange::MediumTerm.as_str(), "medium_term");
    }
}
