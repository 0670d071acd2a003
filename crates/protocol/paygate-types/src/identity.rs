//! Agent identities.

use serde::{Deserialize, Serialize};

use crate::clock::now_ms;

/// Public identity of a seller or buyer agent.
///
/// Identities are immutable once created; hosts build a new one rather than
/// editing fields in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentIdentity {
    /// Stable identifier, unique per agent.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// On-chain address that receives or sends payments.
    pub wallet_address: String,
    /// Free-form discovery tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Creation time (Unix ms).
    pub created_at: u64,
}

impl AgentIdentity {
    /// Create an identity stamped with the current time.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        wallet_address: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            wallet_address: wallet_address.into(),
            tags: Vec::new(),
            created_at: now_ms(),
        }
    }

    /// Attach discovery tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}
