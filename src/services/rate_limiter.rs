use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum delay between consecutive requests to one upstream.
///
/// One instance is shared by every request to that upstream. The slot is
/// held until the caller's request has been sent, so at most one request
/// per limiter is ever in flight.
#[derive(Debug)]
pub struct RateLimiter {
    name: &'static str,
    min_delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(name: &'static str, min_delay: Duration) -> Self {
        Self {
            name,
            min_delay,
            last_request: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Runs `request` once the minimum delay since the previous request has
    /// elapsed. Other callers wait until `request` resolves.
    pub async fn run<F, T>(&self, request: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_delay {
                let delay = self.min_delay - elapsed;
                tracing::trace!(
                    limiter = self.name,
                    delay_ms = delay.as_millis() as u64,
                    "Rate limit wait"
                );
                tokio::time::sleep(delay).await;
            }
        }

        *last = Some(Instant::now());
        request.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_first_request_is_immediate() {
        let limiter = RateLimiter::new("test", Duration::from_millis(1000));
        let start = Instant::now();

        limiter.run(async {}).await;

        assert!(start.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_requests_are_spaced() {
        let limiter = RateLimiter::new("test", Duration::from_millis(1000));
        let start = Instant::now();

        limiter.run(async {}).await;
        limiter.run(async {}).await;
        limiter.run(async {}).await;

        assert!(start.elapsed() >= Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_never_overlap() {
        let limiter = Arc::new(RateLimiter::new("test", Duration::from_millis(100)));
        let in_flight = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut tasks = Vec::new();

        for _ in 0..4 {
            let limiter = limiter.clone();
            let in_flight = in_flight.clone();
            tasks.push(tokio::spawn(async move {
                limiter
                    .run(async {
                        let now = in_flight.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                        assert_eq!(now, 0);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        in_flight.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
                    })
                    .await;
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }
    }
}
