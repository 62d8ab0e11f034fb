use std::time::Duration;
use tokio::time::Instant;

/// Fixed quota of requests per window. The window restarts lazily: the next
/// time someone asks after it has elapsed. Nothing here runs in the
/// background and nothing is persisted.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    counter: u32,
    window_start: Instant,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> RateLimiter {
        RateLimiter {
            max_requests,
            window,
            counter: 0,
            window_start: Instant::now(),
        }
    }

    /// Check if we can make a request now, restarting the window if it has
    /// elapsed. This does not consume quota.
    pub fn can_ask(&mut self) -> bool {
        if self.window_start.elapsed() >= self.window {
            self.reset();
        }
        self.counter < self.max_requests
    }

    /// Count one request against the quota
    pub fn record(&mut self) {
        self.counter += 1;
    }

    /// Time left until the window restarts
    pub fn remaining(&self) -> Duration {
        self.window.saturating_sub(self.window_start.elapsed())
    }

    pub fn used(&self) -> u32 {
        self.counter
    }

    fn reset(&mut self) {
        tracing::debug!("Geolocation quota window restarted");
        self.counter = 0;
        self.window_start = Instant::now();
    }
}
