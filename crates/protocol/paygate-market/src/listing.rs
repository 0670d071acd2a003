//! Tool listings.

use paygate_types::{AgentIdentity, PricingTier, DEFAULT_REPUTATION_SCORE};
use serde::{Deserialize, Serialize};

/// A method offered for sale by one seller.
///
/// Keyed by `(method, seller.id)`; re-listing the same key overwrites it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolListing {
    pub method: String,
    #[serde(default)]
    pub description: String,
    pub seller: AgentIdentity,
    #[serde(default)]
    pub tiers: Vec<PricingTier>,
    /// Average of the seller's recent reported latencies.
    #[serde(default)]
    pub avg_latency_ms: f64,
    #[serde(default = "full_uptime")]
    pub uptime_percent: f64,
    /// Calls served, as counted by reputation reports.
    #[serde(default)]
    pub total_served: u64,
    /// Derived trust metric in `[0, 1000]`.
    #[serde(default = "default_score")]
    pub reputation_score: u32,
    #[serde(default)]
    pub attestation_available: bool,
    #[serde(default)]
    pub region: Option<String>,
    /// Free-form service commitments (SLA notes, data freshness).
    #[serde(default)]
    pub commitments: Vec<String>,
    pub listed_at: u64,
    pub updated_at: u64,
}

fn full_uptime() -> f64 {
    100.0
}

fn default_score() -> u32 {
    DEFAULT_REPUTATION_SCORE
}

impl ToolListing {
    /// New listing with neutral metrics; timestamps are set on insertion.
    pub fn new(method: impl Into<String>, seller: AgentIdentity) -> Self {
        Self {
            method: method.into(),
            description: String::new(),
            seller,
            tiers: Vec::new(),
            avg_latency_ms: 0.0,
            uptime_percent: full_uptime(),
            total_served: 0,
            reputation_score: DEFAULT_REPUTATION_SCORE,
            attestation_available: false,
            region: None,
            commitments: Vec::new(),
            listed_at: 0,
            updated_at: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tiers(mut self, tiers: Vec<PricingTier>) -> Self {
        self.tiers = tiers;
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_attestation(mut self, available: bool) -> Self {
        self.attestation_available = available;
        self
    }

    pub fn with_commitment(mut self, commitment: impl Into<String>) -> Self {
        self.commitments.push(commitment.into());
        self
    }

    pub fn with_reputation_score(mut self, score: u32) -> Self {
        self.reputation_score = score;
        self
    }

    pub fn seller_id(&self) -> &str {
        &self.seller.id
    }

    /// Cheapest per-call price across the listing's tiers.
    pub fn min_price(&self) -> Option<u64> {
        self.tiers.iter().map(|t| t.price_per_call).min()
    }
}
