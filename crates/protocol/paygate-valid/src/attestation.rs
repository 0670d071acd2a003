//! Attestation records.

use serde::{Deserialize, Serialize};

/// Hash-based proof that `response` was returned for `request` at `slot`.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseAttestation {
    pub session_id: String,
    pub method: String,
    /// SHA-256 (hex) of the canonical request params.
    pub request_hash: String,
    /// SHA-256 (hex) of the canonical response.
    pub response_hash: String,
    pub slot: u64,
    pub attester_id: String,
    /// Hex signature over [`signing_message`](Self::signing_message); empty
    /// when no signer was configured.
    pub signature: String,
    /// Unix ms.
    pub timestamp: u64,
}

impl ResponseAttestation {
    /// The exact string that gets signed: `method|requestHash|responseHash|slot`.
    pub fn signing_message(&self) -> String {
        signing_message(&self.method, &self.request_hash, &self.response_hash, self.slot)
    }

    /// Unsigned attestations prove integrity only, not authenticity.
    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }
}

pub(crate) fn signing_message(
    method: &str,
    request_hash: &str,
    response_hash: &str,
    slot: u64,
) -> String {
    format!("{method}|{request_hash}|{response_hash}|{slot}")
}

/// Outcome of [`ResponseValidator::verify_integrity`](crate::ResponseValidator::verify_integrity).
///
/// The two sides are reported separately so a verifier can tell which one
/// was tampered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    pub request_match: bool,
    pub response_match: bool,
    pub valid: bool,
}
