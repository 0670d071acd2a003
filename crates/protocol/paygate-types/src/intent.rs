//! Payment intents.

use serde::{Deserialize, Serialize};

use crate::identity::AgentIdentity;
use crate::Amount;

/// A buyer's signed offer to open a metered session.
///
/// Intents are single-use; nonce uniqueness is the caller's responsibility,
/// though the gateway also rejects nonces it has already seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    /// Unique nonce.
    pub nonce: String,
    /// The buying agent.
    pub buyer: AgentIdentity,
    /// The selling agent.
    pub seller: AgentIdentity,
    /// Tier the buyer wants.
    pub tier_id: String,
    /// Budget ceiling for the session.
    pub max_budget: Amount,
    /// Settlement token.
    pub token: String,
    /// Buyer signature over [`PaymentIntent::signing_message`].
    #[serde(default)]
    pub signature: String,
    /// Creation time (Unix ms).
    pub created_at: u64,
    /// Validity window in seconds (0 = no expiry).
    pub ttl: u64,
}

impl PaymentIntent {
    /// Message the buyer signs.
    ///
    /// Fields are joined with `|` in a fixed order so every implementation
    /// reproduces the same bytes.
    pub fn signing_message(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}",
            self.nonce,
            self.buyer.id,
            self.seller.id,
            self.tier_id,
            self.max_budget,
            self.token,
            self.created_at,
            self.ttl
        )
    }

    /// True once `now_ms` is at or past `created_at + ttl`.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.ttl > 0 && now_ms >= self.created_at.saturating_add(self.ttl.saturating_mul(1_000))
    }
}
