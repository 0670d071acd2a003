//! Validator configuration.

use paygate_types::DEFAULT_ATTESTATION_CAPACITY;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidatorConfig {
    /// Attestations retained before the oldest is evicted.
    pub capacity: usize,
    /// Recorded attester id; defaults to the signer's id.
    pub attester_id: Option<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_ATTESTATION_CAPACITY,
            attester_id: None,
        }
    }
}

impl ValidatorConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_attester_id(mut self, id: impl Into<String>) -> Self {
        self.attester_id = Some(id.into());
        self
    }
}
