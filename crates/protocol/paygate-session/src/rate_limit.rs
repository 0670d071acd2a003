//! Sliding-window rate limiter.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Allows at most `max_per_window` calls in any `window_ms` span.
///
/// Timestamps are supplied by the caller, which keeps the limiter
/// deterministic under test clocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimiter {
    pub window_ms: u64,
    pub max_per_window: u32,
    timestamps: VecDeque<u64>,
}

impl RateLimiter {
    pub fn new(window_ms: u64, max_per_window: u32) -> Self {
        Self {
            window_ms,
            max_per_window,
            timestamps: VecDeque::new(),
        }
    }

    /// Check whether a call may start at `now_ms`.
    ///
    /// Prunes timestamps that fell out of the window. On rejection returns
    /// the milliseconds until the oldest call leaves the window (at least 1).
    pub fn check(&mut self, now_ms: u64) -> Result<(), u64> {
        self.prune(now_ms);
        if self.timestamps.len() >= self.max_per_window as usize {
            let oldest = self.timestamps.front().copied().unwrap_or(now_ms);
            let elapsed = now_ms.saturating_sub(oldest);
            return Err(self.window_ms.saturating_sub(elapsed).max(1));
        }
        Ok(())
    }

    /// Record a completed call.
    pub fn record(&mut self, now_ms: u64) {
        self.timestamps.push_back(now_ms);
    }

    /// Calls counted in the window as of the last prune.
    pub fn in_window(&self) -> usize {
        self.timestamps.len()
    }

    fn prune(&mut self, now_ms: u64) {
        while let Some(&ts) = self.timestamps.front() {
            if now_ms.saturating_sub(ts) >= self.window_ms {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_limit() {
        let mut rl = RateLimiter::new(1_000, 3);
        for t in [0, 10, 20] {
            assert!(rl.check(t).is_ok());
            rl.record(t);
        }
        assert_eq!(rl.check(30), Err(970));
    }

    #[test]
    fn test_window_slides() {
        let mut rl = RateLimiter::new(1_000, 2);
        rl.record(0);
        rl.record(500);
        assert!(rl.check(999).is_err());
        // first call leaves the window at t=1000
        assert!(rl.check(1_000).is_ok());
        assert_eq!(rl.in_window(), 1);
    }

    #[test]
    fn test_zero_limit_always_rejects() {
        let mut rl = RateLimiter::new(1_000, 0);
        assert_eq!(rl.check(5), Err(1_000));
    }
}
