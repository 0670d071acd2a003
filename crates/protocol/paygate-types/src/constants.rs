//! Gateway-wide defaults.

use crate::Amount;

// =============================================================================
// Sessions
// =============================================================================

/// Sentinel for "no per-session call limit".
pub const UNLIMITED_CALLS: i64 = -1;

/// Rate limit window applied to tiers (tier `rate_limit` is calls per second).
pub const DEFAULT_RATE_WINDOW_MS: u64 = 1_000;

/// Remaining-budget fraction at or below which a budget warning fires.
pub const BUDGET_WARNING_FRACTION: f64 = 0.2;

/// Default session time-to-live in seconds (0 disables expiry).
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3_600;

// =============================================================================
// Pricing
// =============================================================================

/// Average latency above which surge pricing applies.
pub const DEFAULT_CONGESTION_THRESHOLD_MS: f64 = 500.0;

/// Upper bound on the surge multiplier.
pub const DEFAULT_CONGESTION_MAX_MULTIPLIER: f64 = 3.0;

/// Discount applied to bundle session costs.
pub const DEFAULT_BUNDLE_DISCOUNT: f64 = 0.15;

/// Sample window used to derive the latency EMA smoothing factor.
pub const DEFAULT_LATENCY_EMA_WINDOW: u32 = 20;

/// Lower bound on the EMA smoothing factor once warmed up.
pub const MIN_EMA_ALPHA: f64 = 0.1;

/// Price of a free tier.
pub const FREE_PRICE: Amount = 0;

// =============================================================================
// Attestation
// =============================================================================

/// Default capacity of the attestation ring buffer.
pub const DEFAULT_ATTESTATION_CAPACITY: usize = 10_000;

// =============================================================================
// Marketplace
// =============================================================================

/// Upper bound of a listing's reputation score.
pub const MAX_REPUTATION_SCORE: u32 = 1_000;

/// Reputation assigned to a seller with no attestation history.
pub const DEFAULT_REPUTATION_SCORE: u32 = 500;

/// Number of recent latencies kept per seller.
pub const REPUTATION_LATENCY_WINDOW: usize = 100;

// =============================================================================
// x402
// =============================================================================

/// Default facilitator HTTP timeout in seconds.
pub const DEFAULT_FACILITATOR_TIMEOUT_SECS: u64 = 30;

/// How long a facilitator `/supported` response is cached, in seconds.
pub const SUPPORTED_CACHE_TTL_SECS: u64 = 60;

/// Wait after a failed `/supported` refresh before trying again, in seconds.
pub const SUPPORTED_RETRY_BACKOFF_SECS: u64 = 5;

/// Default maximum payment validity window in seconds.
pub const DEFAULT_MAX_TIMEOUT_SECONDS: u64 = 300;

/// Default number of paid attempts a buyer client will make.
pub const DEFAULT_MAX_PAYMENT_ATTEMPTS: u32 = 3;
