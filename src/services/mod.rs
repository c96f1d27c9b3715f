pub mod codec;
pub mod fingerprint;
pub mod identity;
pub mod pool;
pub mod progress;
pub mod providers;
pub mod rate_limiter;
pub mod recency;
pub mod recommendations;
pub mod sampler;

pub use fingerprint::FingerprintBuilder;
pub use progress::{ProgressStage, ProgressTracker, ProgressUpdate};
pub use rate_limiter::RateLimiter;
pub use recency::{Clock, SystemClock};
pub use recommendations::{EngineSettings, RecommendationEngine};
