//! x402 protocol types.
//!
//! Wire shapes for the version 2 handshake. Headers carry base64-encoded
//! JSON; facilitator endpoints take and return plain JSON.

use base64::{prelude::BASE64_STANDARD, Engine};
use paygate_types::Amount;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{X402Error, X402Result};

/// x402 protocol version.
pub const X402_VERSION: u32 = 2;

/// Request header carrying the buyer's payment (client -> server).
pub const HEADER_PAYMENT_SIGNATURE: &str = "PAYMENT-SIGNATURE";

/// Response header carrying the payment challenge on 402 (server -> client).
pub const HEADER_PAYMENT_REQUIRED: &str = "PAYMENT-REQUIRED";

/// Response header carrying the settlement summary (server -> client).
pub const HEADER_PAYMENT_RESPONSE: &str = "PAYMENT-RESPONSE";

/// The only payment scheme the gateway offers.
pub const SCHEME_EXACT: &str = "exact";

// =============================================================================
// Payment Requirements (402 Response)
// =============================================================================

/// One way the buyer may pay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    /// Payment scheme (e.g. "exact").
    pub scheme: String,

    /// CAIP-2 network id (e.g. "eip155:8453").
    pub network: String,

    /// Asset address or symbol.
    pub asset: String,

    /// Amount in the asset's smallest unit, as a decimal string.
    pub amount: String,

    /// Recipient address.
    pub pay_to: String,

    /// How long a signed payment stays valid.
    pub max_timeout_seconds: u64,

    /// Scheme-specific extras (e.g. `feePayer`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

impl PaymentRequirements {
    /// Parse [`amount`](Self::amount) as an integer.
    pub fn amount_units(&self) -> X402Result<Amount> {
        self.amount
            .trim()
            .parse::<Amount>()
            .map_err(|_| X402Error::malformed(format!("amount '{}' is not an integer", self.amount)))
    }

    /// True when `other` names the same payment terms.
    ///
    /// `extra` is ignored; addresses and assets compare case-insensitively.
    pub fn matches(&self, other: &PaymentRequirements) -> bool {
        self.scheme == other.scheme
            && self.network == other.network
            && self.asset.eq_ignore_ascii_case(&other.asset)
            && self.amount.trim() == other.amount.trim()
            && self.pay_to.eq_ignore_ascii_case(&other.pay_to)
    }

    /// The facilitator-provided fee payer, when present.
    pub fn fee_payer(&self) -> Option<&str> {
        self.extra.as_ref()?.get("feePayer")?.as_str()
    }
}

/// The resource being paid for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfo {
    /// Resource URL or URI.
    pub url: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// MIME type of the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Body of the `PAYMENT-REQUIRED` header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequired {
    /// x402 protocol version.
    pub x402_version: u32,

    /// Why the previous payment was rejected, if one was sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub resource: ResourceInfo,

    /// Payment options the buyer may choose from.
    pub accepts: Vec<PaymentRequirements>,
}

// =============================================================================
// Payment Payload (Client -> Server)
// =============================================================================

/// Body of the `PAYMENT-SIGNATURE` header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    /// x402 protocol version.
    pub x402_version: u32,

    /// The requirement the buyer chose to satisfy.
    pub accepted: PaymentRequirements,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceInfo>,

    /// Scheme-specific signed authorization.
    pub payload: Value,
}

// =============================================================================
// Facilitator API Types
// =============================================================================

/// Body for `POST /verify` and `POST /settle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilitatorRequest {
    pub x402_version: u32,
    pub payment_payload: PaymentPayload,
    pub payment_requirements: PaymentRequirements,
}

/// Response from `POST /verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub is_valid: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

impl VerifyResponse {
    pub fn valid(payer: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            invalid_reason: None,
            payer: Some(payer.into()),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            invalid_reason: Some(reason.into()),
            payer: None,
        }
    }
}

/// Response from `POST /settle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    pub success: bool,

    /// On-chain transaction id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
}

/// One scheme/network pair a facilitator handles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedKind {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x402_version: Option<u32>,
    pub scheme: String,
    pub network: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

/// Response from `GET /supported`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedResponse {
    #[serde(default)]
    pub kinds: Vec<SupportedKind>,
}

impl SupportedResponse {
    /// Fee payer advertised for a scheme/network pair.
    pub fn fee_payer(&self, scheme: &str, network: &str) -> Option<String> {
        self.kinds
            .iter()
            .filter(|k| k.scheme == scheme && k.network == network)
            .find_map(|k| k.extra.as_ref()?.get("feePayer")?.as_str().map(str::to_string))
    }

    pub fn supports(&self, scheme: &str, network: &str) -> bool {
        self.kinds
            .iter()
            .any(|k| k.scheme == scheme && k.network == network)
    }
}

/// Body of the `PAYMENT-RESPONSE` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementSummary {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

impl From<&SettleResponse> for SettlementSummary {
    fn from(settle: &SettleResponse) -> Self {
        Self {
            success: settle.success,
            transaction: settle.transaction.clone(),
            network: settle.network.clone(),
            payer: settle.payer.clone(),
        }
    }
}

// =============================================================================
// Header Encoding
// =============================================================================

/// Encode a value as base64 JSON for an x402 header.
pub fn encode_header<T: Serialize>(value: &T) -> X402Result<String> {
    let json = serde_json::to_vec(value)
        .map_err(|e| X402Error::malformed(format!("failed to serialize header: {e}")))?;
    Ok(BASE64_STANDARD.encode(json))
}

/// Decode a base64 JSON x402 header.
pub fn decode_header<T: DeserializeOwned>(header: &str) -> X402Result<T> {
    let bytes = BASE64_STANDARD
        .decode(header.trim())
        .map_err(|e| X402Error::malformed(format!("invalid base64: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| X402Error::malformed(format!("invalid JSON: {e}")))
}
