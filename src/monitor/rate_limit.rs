use std::time::Duration;

use tokio::time::{sleep_until, Instant};

/// Spaces out outbound fetch rounds: `wait()` returns no sooner than
/// `min_interval` after the previous `wait()` returned. The first call
/// returns immediately.
///
/// Uses tokio's clock, so paused-time tests control it.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval, last: None }
    }

    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            let ready_at = last + self.min_interval;
            if Instant::now() < ready_at {
                sleep_until(ready_at).await;
            }
        }
        self.last = Some(Instant::now());
    }
}
