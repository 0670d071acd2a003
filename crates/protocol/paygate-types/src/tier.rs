//! Pricing tiers.

use serde::{Deserialize, Serialize};

use crate::constants::UNLIMITED_CALLS;
use crate::Amount;

/// A named pricing / rate-limit / feature bundle offered to buyers.
///
/// Tiers are configuration: created at gateway startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingTier {
    /// Tier identifier, unique per gateway.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Base price of one call in the smallest currency unit.
    pub price_per_call: Amount,
    /// Maximum calls per session, or [`UNLIMITED_CALLS`].
    #[serde(default = "unlimited")]
    pub max_calls_per_session: i64,
    /// Calls allowed per one-second window.
    pub rate_limit: u32,
    /// Settlement token (e.g. "USDC").
    pub token: String,
    /// Whether responses on this tier carry an attestation.
    #[serde(default)]
    pub includes_attestation: bool,
}

fn unlimited() -> i64 {
    UNLIMITED_CALLS
}

impl PricingTier {
    /// Create a tier with unlimited calls, 10 calls/s and USDC pricing.
    pub fn new(id: impl Into<String>, label: impl Into<String>, price_per_call: Amount) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            price_per_call,
            max_calls_per_session: UNLIMITED_CALLS,
            rate_limit: 10,
            token: "USDC".to_string(),
            includes_attestation: false,
        }
    }

    /// Set the per-session call limit.
    pub fn with_max_calls(mut self, max_calls: i64) -> Self {
        self.max_calls_per_session = max_calls;
        self
    }

    /// Set the per-second rate limit.
    pub fn with_rate_limit(mut self, rate_limit: u32) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Set the settlement token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// Enable or disable response attestation.
    pub fn with_attestation(mut self, enabled: bool) -> Self {
        self.includes_attestation = enabled;
        self
    }

    /// Free tiers are never surge-priced.
    pub fn is_free(&self) -> bool {
        self.price_per_call == 0
    }

    /// True when the tier does not cap calls per session.
    pub fn is_unlimited(&self) -> bool {
        self.max_calls_per_session == UNLIMITED_CALLS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_defaults() {
        let tier = PricingTier::new("free", "Free", 0);
        assert!(tier.is_free());
        assert!(tier.is_unlimited());
        assert_eq!(tier.token, "USDC");
    }

    #[test]
    fn test_tier_deserialize_defaults_unlimited() {
        let tier: PricingTier = serde_json::from_value(serde_json::json!({
            "id": "pro",
            "label": "Pro",
            "pricePerCall": 2500,
            "rateLimit": 50,
            "token": "USDC"
        }))
        .unwrap();
        assert!(tier.is_unlimited());
        assert!(!tier.includes_attestation);
        assert_eq!(tier.price_per_call, 2500);
    }
}
