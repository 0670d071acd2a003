//! Session configuration.

use paygate_types::{BUDGET_WARNING_FRACTION, DEFAULT_RATE_WINDOW_MS, DEFAULT_SESSION_TTL_SECS};
use serde::{Deserialize, Serialize};

/// Limits applied to each new session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Lifetime in seconds; 0 disables expiry.
    pub ttl_secs: u64,
    /// Rate-limit window length.
    pub rate_window_ms: u64,
    /// Calls per window; `None` uses the tier's `rate_limit`.
    pub rate_max_per_window: Option<u32>,
    /// Remaining-budget fraction that triggers the one-off warning.
    pub budget_warning_fraction: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_SESSION_TTL_SECS,
            rate_window_ms: DEFAULT_RATE_WINDOW_MS,
            rate_max_per_window: None,
            budget_warning_fraction: BUDGET_WARNING_FRACTION,
        }
    }
}

impl SessionConfig {
    pub fn with_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    pub fn with_rate_window_ms(mut self, window_ms: u64) -> Self {
        self.rate_window_ms = window_ms;
        self
    }

    pub fn with_rate_max_per_window(mut self, max: u32) -> Self {
        self.rate_max_per_window = Some(max);
        self
    }

    pub fn with_budget_warning_fraction(mut self, fraction: f64) -> Self {
        self.budget_warning_fraction = fraction;
        self
    }
}
