use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable snapshot of a user's derived taste
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fingerprint {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub user: UserProfile,
    pub taste: Taste,
    /// MRIDs of recommendations already shown when the fingerprint was built
    #[serde(default)]
    pub seen_recommendations: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Taste {
    pub artists: Vec<TasteArtist>,
    pub liked_tracks: Vec<LikedTrack>,
    /// Ranked descending by score
    pub genres: Vec<GenreScore>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TasteArtist {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub genres: Vec<String>,
    #[serde(default)]
    pub is_top_artist: bool,
}

/// A liked track as kept in the fingerprint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LikedTrack {
    #[serde(default)]
    pub id: Option<String>,
    pub artist: String,
    pub name: String,
    #[serde(default)]
    pub added_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenreScore {
    pub name: String,
    pub score: f64,
}

impl GenreScore {
    pub fn new(name: impl Into<String>, score: f64) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

impl Fingerprint {
    /// Whether the fingerprint carries anything to sample genres from
    pub fn has_genres(&self) -> bool {
        !self.taste.genres.is_empty()
    }
}
