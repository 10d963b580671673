//! In-memory sliding-window rate limiter for the login endpoint.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct RateLimiter {
    requests: Arc<RwLock<HashMap<String, Vec<Instant>>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window_secs: u64) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Records an attempt for `identifier` (IP, user id) and reports whether
    /// it is within the window limit.
    pub async fn check(&self, identifier: &str) -> bool {
        let now = Instant::now();
        let mut requests = self.requests.write().await;

        let history = requests.entry(identifier.to_string()).or_default();
        history.retain(|&at| now.duration_since(at) < self.window);

        if history.len() < self.max_requests {
            history.push(now);
            true
        } else {
            false
        }
    }

    /// Drops identifiers whose whole history fell out of the window.
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        requests.retain(|_, history| {
            history.retain(|&at| now.duration_since(at) < self.window);
            !history.is_empty()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blocks_after_limit_within_window() {
        let limiter = RateLimiter::new(3, 60);

        assert!(limiter.check("10.0.0.1").await);
        assert!(limiter.check("10.0.0.1").await);
        assert!(limiter.check("10.0.0.1").await);
        assert!(!limiter.check("10.0.0.1").await);

        // Other identifiers are unaffected.
        assert!(limiter.check("10.0.0.2").await);
    }

    #[tokio::test]
    async fn cleanup_drops_expired_histories() {
        let limiter = RateLimiter::new(5, 1);

        limiter.check("a").await;
        limiter.check("b").await;

        tokio::time::sleep(Duration::from_secs(2)).await;
        limiter.cleanup().await;

        let requests = limiter.requests.read().await;
        assert!(requests.is_empty());
    }
}
