use serde::Serialize;
use tokio::sync::mpsc;

/// Stages of a fingerprint build, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    LikedTracks,
    FollowedArtists,
    TopArtists,
    ArtistDetails,
}

impl ProgressStage {
    const ORDER: [ProgressStage; 4] = [
        ProgressStage::LikedTracks,
        ProgressStage::FollowedArtists,
        ProgressStage::TopArtists,
        ProgressStage::ArtistDetails,
    ];

    /// Share of the overall build attributed to this stage
    fn weight(self) -> f64 {
        match self {
            ProgressStage::LikedTracks => 0.4,
            ProgressStage::FollowedArtists => 0.15,
            ProgressStage::TopArtists => 0.15,
            ProgressStage::ArtistDetails => 0.3,
        }
    }

    /// Summed weight of every stage before this one
    fn base(self) -> f64 {
        Self::ORDER
            .iter()
            .take_while(|stage| **stage != self)
            .map(|stage| stage.weight())
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub stage: ProgressStage,
    pub percent: u8,
    pub message: String,
}

/// Within-stage completion ratio for a paginated fetch.
///
/// Known totals cap at 0.99 so only the explicit end-of-stage report
/// reaches 1.
pub fn page_ratio(processed: usize, total: Option<u32>) -> f64 {
    match total {
        Some(total) if total > 0 => (processed as f64 / total as f64).min(0.99),
        _ if processed > 0 => 0.5,
        _ => 0.25,
    }
}

/// Turns per-stage ratios into one overall, non-decreasing percentage.
///
/// Percentages stay at or below 99 until [`ProgressTracker::complete`].
pub struct ProgressTracker {
    sink: Option<mpsc::UnboundedSender<ProgressUpdate>>,
    last_percent: u8,
}

impl ProgressTracker {
    pub fn new(sink: mpsc::UnboundedSender<ProgressUpdate>) -> Self {
        Self {
            sink: Some(sink),
            last_percent: 0,
        }
    }

    /// Tracker that only logs
    pub fn silent() -> Self {
        Self {
            sink: None,
            last_percent: 0,
        }
    }

    pub fn report(&mut self, stage: ProgressStage, ratio: f64, message: impl Into<String>) {
        let ratio = ratio.clamp(0.0, 1.0);
        let overall = stage.base() + ratio * stage.weight();
        let percent = ((overall * 100.0).round() as u8).min(99);

        self.last_percent = self.last_percent.max(percent);
        self.emit(ProgressUpdate {
            stage,
            percent: self.last_percent,
            message: message.into(),
        });
    }

    /// Final 100% update, sent once the whole pipeline succeeded
    pub fn complete(&mut self, message: impl Into<String>) {
        self.last_percent = 100;
        self.emit(ProgressUpdate {
            stage: ProgressStage::ArtistDetails,
            percent: 100,
            message: message.into(),
        });
    }

    pub fn percent(&self) -> u8 {
        self.last_percent
    }

    fn emit(&self, update: ProgressUpdate) {
        tracing::debug!(
            stage = ?update.stage,
            percent = update.percent,
            message = %update.message,
            "Fingerprint progress"
        );

        if let Some(sink) = &self.sink {
            // A closed receiver means the client went away; the build carries on.
            let _ = sink.send(update);
        }
    }
}
