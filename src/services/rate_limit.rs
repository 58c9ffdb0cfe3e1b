//! Per-caller request throttle
//!
//! Sliding-window limiter for the claim endpoints: a burst of retries from
//! one caller must not starve the admission queue for everyone else. Keys
//! are caller identities, falling back to the client address for requests
//! without one.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

/// Sliding-window rate limiter keyed by caller.
pub struct RateLimiter {
    /// Request timestamps per key within the current window
    requests: DashMap<String, Vec<Instant>>,
    /// Window size
    window: Duration,
    /// Max requests per window
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            requests: DashMap::new(),
            window,
            max_requests,
        }
    }

    /// Check if a request is allowed and record it.
    pub fn check_and_record(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entry = self.requests.entry(key.to_string()).or_default();

        // Drop requests that fell out of the window
        entry.retain(|&ts| now.duration_since(ts) < self.window);

        if entry.len() >= self.max_requests as usize {
            debug!(key = key, "rate limit exhausted");
            return false;
        }

        entry.push(now);
        true
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.requests.len()
    }

    /// Drop keys whose every recorded request has left the window.
    pub fn sweep(&self) {
        let now = Instant::now();
        let window = self.window;
        self.requests
            .retain(|_, stamps| stamps.iter().any(|&ts| now.duration_since(ts) < window));
    }
}
