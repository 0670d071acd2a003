//! Latency tracking for congestion pricing.
//!
//! Reported latencies feed an exponential moving average. The smoothing
//! factor for the k-th sample is
//! ```text
//! alpha_k = max(2 / (min(k, window) + 1), 0.1)
//! ```
//! so the first sample sets the average outright and later samples settle
//! towards a fixed floor.

use paygate_types::MIN_EMA_ALPHA;

/// Exponential moving average of call latency.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencyEma {
    average_ms: f64,
    samples: u64,
}

impl LatencyEma {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one latency sample into the average.
    pub fn record(&mut self, latency_ms: f64, window: u32) {
        if !latency_ms.is_finite() || latency_ms < 0.0 {
            return;
        }
        self.samples += 1;
        let k = self.samples.min(u64::from(window.max(1))) as f64;
        let alpha = (2.0 / (k + 1.0)).max(MIN_EMA_ALPHA);
        self.average_ms = alpha * latency_ms + (1.0 - alpha) * self.average_ms;
    }

    /// Current average, 0 before any sample.
    pub fn average_ms(&self) -> f64 {
        self.average_ms
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }
}

/// Surge multiplier for an average latency.
///
/// 1.0 at or below the threshold, otherwise `avg / threshold` capped at
/// `max_multiplier`.
pub fn congestion_multiplier(average_ms: f64, threshold_ms: f64, max_multiplier: f64) -> f64 {
    if threshold_ms <= 0.0 || average_ms <= threshold_ms {
        return 1.0;
    }
    (average_ms / threshold_ms).min(max_multiplier).max(1.0)
}
