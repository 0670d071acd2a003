//! Session state and settlement summary.

use std::collections::{BTreeMap, HashMap};

use paygate_types::{AgentIdentity, Amount, PricingTier};
use serde::{Deserialize, Serialize};

use crate::rate_limit::RateLimiter;
use crate::status::SessionStatus;

/// Full state of one session.
///
/// Owned by a single [`AgentSession`](crate::AgentSession);
/// [`snapshot`](crate::AgentSession::snapshot) hands out copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub id: String,
    pub status: SessionStatus,
    pub buyer: AgentIdentity,
    pub seller: AgentIdentity,
    pub tier: PricingTier,
    /// Nonce of the intent that opened the session.
    pub intent_nonce: String,
    pub budget_remaining: Amount,
    pub budget_total: Amount,
    pub calls_made: u64,
    /// Calls left, or -1 when the tier is unlimited.
    pub calls_remaining: i64,
    pub method_counts: BTreeMap<String, u64>,
    pub rate_limiter: RateLimiter,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Unix ms.
    pub created_at: u64,
    /// Unix ms.
    pub last_activity_at: u64,
    /// Seconds; 0 = no expiry.
    pub ttl: u64,
}

impl SessionState {
    /// Amount charged so far.
    pub fn budget_used(&self) -> Amount {
        self.budget_total.saturating_sub(self.budget_remaining)
    }
}

/// Usage summary returned by settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub session_id: String,
    pub amount_charged: Amount,
    pub call_count: u64,
    pub method_counts: BTreeMap<String, u64>,
    /// Unix ms.
    pub settled_at: u64,
}
