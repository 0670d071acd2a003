//! Tool bundles.

use serde::{Deserialize, Serialize};

use crate::identity::AgentIdentity;
use crate::tier::PricingTier;

/// A named, discounted group of methods sold together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolBundle {
    /// Bundle identifier, unique per registry.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Methods covered by the bundle.
    pub methods: Vec<String>,
    pub seller: AgentIdentity,
    /// Tiers the bundle can be bought on.
    #[serde(default)]
    pub tiers: Vec<PricingTier>,
    /// Creation time (Unix ms).
    pub created_at: u64,
}

impl ToolBundle {
    /// True if `method` is part of this bundle.
    pub fn covers(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m == method)
    }

    /// Look up one of the bundle's own tiers.
    pub fn tier(&self, tier_id: &str) -> Option<&PricingTier> {
        self.tiers.iter().find(|t| t.id == tier_id)
    }
}
