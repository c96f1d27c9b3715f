use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single discovered track returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub title: String,
    pub artist: String,
    /// Genre label the recommendation was drawn for
    pub genre: String,
    #[serde(default)]
    pub isrc: Option<String>,
    /// Catalog record ID
    #[serde(default)]
    pub mbid: Option<String>,
    /// Artist+title identity key used to mark the track as shown
    pub mrid: String,
}

/// Which persisted dedupe set an MRID belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeenKind {
    Displayed,
    NoVideo,
}

/// Identifiers that survive across recommendation runs
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DedupeCache {
    #[serde(default)]
    pub displayed: BTreeSet<String>,
    #[serde(default)]
    pub no_video: BTreeSet<String>,
}

impl DedupeCache {
    /// Union another cache into this one
    pub fn merge(&mut self, other: &DedupeCache) {
        self.displayed.extend(other.displayed.iter().cloned());
        self.no_video.extend(other.no_video.iter().cloned());
    }

    pub fn insert(&mut self, kind: SeenKind, mrid: impl Into<String>) {
        match kind {
            SeenKind::Displayed => self.displayed.insert(mrid.into()),
            SeenKind::NoVideo => self.no_video.insert(mrid.into()),
        };
    }

    /// Every MRID in either set
    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.displayed.iter().chain(self.no_video.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.displayed.is_empty() && self.no_video.is_empty()
    }
}
