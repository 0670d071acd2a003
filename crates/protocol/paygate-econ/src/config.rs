//! Pricing configuration.

use paygate_types::{
    DEFAULT_BUNDLE_DISCOUNT, DEFAULT_CONGESTION_MAX_MULTIPLIER, DEFAULT_CONGESTION_THRESHOLD_MS,
    DEFAULT_LATENCY_EMA_WINDOW,
};
use serde::{Deserialize, Serialize};

/// Tunables for surge pricing and bundle discounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PricingConfig {
    /// Average latency above which surge pricing starts.
    pub congestion_threshold_ms: f64,
    /// Upper bound on the surge multiplier.
    pub congestion_max_multiplier: f64,
    /// Fraction knocked off bundle session costs.
    pub bundle_discount: f64,
    /// Sample count after which the EMA smoothing factor stops shrinking.
    pub ema_window: u32,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            congestion_threshold_ms: DEFAULT_CONGESTION_THRESHOLD_MS,
            congestion_max_multiplier: DEFAULT_CONGESTION_MAX_MULTIPLIER,
            bundle_discount: DEFAULT_BUNDLE_DISCOUNT,
            ema_window: DEFAULT_LATENCY_EMA_WINDOW,
        }
    }
}

impl PricingConfig {
    pub fn with_congestion_threshold_ms(mut self, ms: f64) -> Self {
        self.congestion_threshold_ms = ms;
        self
    }

    pub fn with_congestion_max_multiplier(mut self, max: f64) -> Self {
        self.congestion_max_multiplier = max;
        self
    }

    pub fn with_bundle_discount(mut self, discount: f64) -> Self {
        self.bundle_discount = discount;
        self
    }

    pub fn with_ema_window(mut self, window: u32) -> Self {
        self.ema_window = window;
        self
    }
}
