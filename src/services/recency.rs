use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Floor applied to every like, including undated ones
pub const LIKE_MIN_WEIGHT: f64 = 0.1;

/// e-folding time of a like's influence, in days
pub const LIKE_WEIGHT_DECAY_DAYS: f64 = 60.0;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a single instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Weight of a like added at `added_at`, decaying exponentially with age.
///
/// Missing or unparsable timestamps get [`LIKE_MIN_WEIGHT`]. Timestamps in
/// the future count as "just now".
pub fn recency_weight(added_at: Option<&str>, now: DateTime<Utc>) -> f64 {
    let Some(timestamp) = added_at.and_then(parse_timestamp) else {
        return LIKE_MIN_WEIGHT;
    };

    let elapsed_ms = (now - timestamp).num_milliseconds();
    let elapsed_days = (elapsed_ms as f64 / 86_400_000.0).max(0.0);
    let decay = (-elapsed_days / LIKE_WEIGHT_DECAY_DAYS).exp();

    decay.max(LIKE_MIN_WEIGHT)
}

/// Parses ISO-8601 timestamps: RFC 3339, `+hhmm` offsets, no offset (UTC),
/// or a bare date (midnight UTC).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc));
    }
    if let Ok(timestamp) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(timestamp.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
