//! Seller reputation.
//!
//! Score in `[0, 1000]`:
//!
//! ```text
//! score = round(1000 × (0.8 × verification_rate + 0.2 × latency_factor))
//! latency_factor = clamp(1 − avg_recent_latency / 5000, 0, 1)
//! ```
//!
//! Monotonic in verification rate, monotonic-decreasing in latency.

use std::collections::VecDeque;

use paygate_types::{DEFAULT_REPUTATION_SCORE, MAX_REPUTATION_SCORE, REPUTATION_LATENCY_WINDOW};
use serde::{Deserialize, Serialize};

const VERIFICATION_WEIGHT: f64 = 0.8;
const LATENCY_WEIGHT: f64 = 0.2;

/// Latency at which the latency factor reaches zero.
const LATENCY_CEILING_MS: f64 = 5_000.0;

/// Attestation history for one seller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationRecord {
    pub total_calls: u64,
    pub successful_attestations: u64,
    /// `successful_attestations / total_calls`.
    pub verification_rate: f64,
    /// Most recent latencies, oldest first.
    pub recent_latencies: VecDeque<u64>,
}

impl ReputationRecord {
    /// Fold in one attestation report.
    pub fn record(&mut self, success: bool, latency_ms: u64) {
        self.total_calls += 1;
        if success {
            self.successful_attestations += 1;
        }
        self.verification_rate = self.successful_attestations as f64 / self.total_calls as f64;

        self.recent_latencies.push_back(latency_ms);
        while self.recent_latencies.len() > REPUTATION_LATENCY_WINDOW {
            self.recent_latencies.pop_front();
        }
    }

    pub fn avg_latency_ms(&self) -> f64 {
        if self.recent_latencies.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.recent_latencies.iter().sum();
        sum as f64 / self.recent_latencies.len() as f64
    }

    /// Current score; neutral until the first report.
    pub fn score(&self) -> u32 {
        if self.total_calls == 0 {
            return DEFAULT_REPUTATION_SCORE;
        }
        let latency_factor = (1.0 - self.avg_latency_ms() / LATENCY_CEILING_MS).clamp(0.0, 1.0);
        let weighted = VERIFICATION_WEIGHT * self.verification_rate + LATENCY_WEIGHT * latency_factor;
        let max = f64::from(MAX_REPUTATION_SCORE);
        (max * weighted).round().clamp(0.0, max) as u32
    }
}
