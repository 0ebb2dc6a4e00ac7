//! Sliding-window throttle for status update deliveries.
//!
//! Limits are keyed per (order, origin) so a single misbehaving gateway
//! retrying one order cannot starve deliveries for other orders, and one
//! origin cannot consume another origin's budget for the same order.
//!
//! Defaults: 10 updates per 60 second window. Configure via
//! THROTTLE_MAX_UPDATES / THROTTLE_WINDOW_SECS.
//!
//! State is process-local. Behind a load balancer each instance enforces
//! its own window, so the effective global limit scales with the number
//! of replicas.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// In-memory sliding-window limiter for update deliveries.
pub struct UpdateRateLimiter {
    /// (order_id, origin) -> timestamps of accepted checks within the window
    attempts: Mutex<HashMap<(String, String), Vec<Instant>>>,
    max_updates: usize,
    window: Duration,
}

impl UpdateRateLimiter {
    pub fn new(max_updates: usize, window_secs: u64) -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
            max_updates,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Record an attempt and return whether it is within the limit.
    ///
    /// Over-limit attempts are not recorded, so a flood of rejected
    /// deliveries does not extend the lockout beyond the window.
    pub fn check(&self, order_id: &str, origin: &str) -> bool {
        let now = Instant::now();
        let key = (order_id.to_string(), origin.to_string());

        let mut attempts = match self.attempts.lock() {
            Ok(guard) => guard,
            // A poisoned lock means a panic elsewhere; fail open so
            // deliveries keep flowing.
            Err(poisoned) => poisoned.into_inner(),
        };

        let timestamps = attempts.entry(key).or_default();
        timestamps.retain(|t| now.duration_since(*t) < self.window);

        if timestamps.len() >= self.max_updates {
            return false;
        }

        timestamps.push(now);
        true
    }

    /// Drop entries whose timestamps have all expired. Called from the
    /// background maintenance task to keep memory bounded.
    pub fn cleanup(&self) {
        let now = Instant::now();
        let mut attempts = match self.attempts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        attempts.retain(|_, timestamps| {
            timestamps.retain(|t| now.duration_since(*t) < self.window);
            !timestamps.is_empty()
        });
    }

    #[cfg(test)]
    pub fn tracked_keys(&self) -> usize {
        self.attempts.lock().map(|a| a.len()).unwrap_or(0)
    }
}

impl Default for UpdateRateLimiter {
    fn default() -> Self {
        Self::new(10, 60)
    }
}
