//! Machine-readable error codes.
//!
//! Every error raised by a paygate crate maps onto one of these codes so hosts
//! can log and branch on failures without parsing messages.

use serde::{Deserialize, Serialize};

/// Gateway error codes.
///
/// Codes are grouped by range: session (0x01xx), payment (0x02xx),
/// facilitator (0x03xx), buyer client (0x04xx), gateway (0x05xx).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u16)]
#[non_exhaustive]
pub enum ErrorCode {
    // =========================================================================
    // Session Errors (0x0100 - 0x01FF)
    // =========================================================================
    /// Operation not allowed in the session's current state
    InvalidState = 0x0100,
    /// Session outlived its TTL
    SessionExpired = 0x0101,
    /// Too many calls inside the rate window
    RateLimitExceeded = 0x0102,
    /// Per-session call allowance used up
    CallLimitExceeded = 0x0103,
    /// Remaining budget cannot cover the next call
    BudgetExhausted = 0x0104,
    /// No session with the given id
    SessionNotFound = 0x0105,

    // =========================================================================
    // Payment Errors (0x0200 - 0x02FF)
    // =========================================================================
    /// Payment is required before the call is served
    PaymentRequired = 0x0200,
    /// Payment payload could not be accepted
    PaymentInvalid = 0x0201,
    /// Payment intent is past its TTL
    IntentExpired = 0x0202,
    /// Payment intent failed validation or signature check
    IntentInvalid = 0x0203,
    /// Payment intent nonce already used
    NonceReused = 0x0204,
    /// Pricing tier does not exist
    TierNotFound = 0x0205,
    /// Pricing tier is malformed
    InvalidTier = 0x0206,
    /// Bundle does not exist
    BundleNotFound = 0x0207,

    // =========================================================================
    // Facilitator Errors (0x0300 - 0x03FF)
    // =========================================================================
    /// Facilitator rejected the payment
    VerifyFailed = 0x0300,
    /// Facilitator failed to settle the payment
    SettleFailed = 0x0301,
    /// Facilitator unreachable or returned garbage
    FacilitatorError = 0x0302,
    /// Facilitator did not answer in time
    FacilitatorTimeout = 0x0303,
    /// Facilitator identifier not in the registry
    UnknownFacilitator = 0x0304,

    // =========================================================================
    // Buyer Client Errors (0x0400 - 0x04FF)
    // =========================================================================
    /// None of the offered requirements is acceptable
    NoAcceptablePayment = 0x0400,
    /// Signer failed to produce a payment payload
    SigningFailed = 0x0401,
    /// Seller kept answering 402 after every paid attempt
    RetriesExhausted = 0x0402,
    /// Payment would exceed the buyer's budget
    BudgetCheckFailed = 0x0403,
    /// Header or payload could not be decoded
    MalformedPayload = 0x0404,

    // =========================================================================
    // Gateway Errors (0x0500 - 0x05FF)
    // =========================================================================
    /// Underlying RPC transport failed
    TransportError = 0x0500,
    /// Attestation could not be produced
    AttestationFailed = 0x0501,
    /// Configuration rejected
    InvalidConfig = 0x0502,
    /// Marketplace listing does not exist
    ListingNotFound = 0x0503,

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal error
    InternalError = 0xFFFF,
}

impl ErrorCode {
    /// Returns true for session errors (0x0100-0x01FF).
    pub fn is_session_error(&self) -> bool {
        (0x0100..=0x01FF).contains(&self.code())
    }

    /// Returns true for payment errors (0x0200-0x02FF).
    pub fn is_payment_error(&self) -> bool {
        (0x0200..=0x02FF).contains(&self.code())
    }

    /// Returns true for facilitator errors (0x0300-0x03FF).
    pub fn is_facilitator_error(&self) -> bool {
        (0x0300..=0x03FF).contains(&self.code())
    }

    /// Returns true for buyer client errors (0x0400-0x04FF).
    pub fn is_client_error(&self) -> bool {
        (0x0400..=0x04FF).contains(&self.code())
    }

    /// Get the numeric code value.
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Stable upper-case name used in logs and wire payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidState => "INVALID_STATE",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::CallLimitExceeded => "CALL_LIMIT_EXCEEDED",
            Self::BudgetExhausted => "BUDGET_EXHAUSTED",
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::PaymentRequired => "PAYMENT_REQUIRED",
            Self::PaymentInvalid => "PAYMENT_INVALID",
            Self::IntentExpired => "INTENT_EXPIRED",
            Self::IntentInvalid => "INTENT_INVALID",
            Self::NonceReused => "NONCE_REUSED",
            Self::TierNotFound => "TIER_NOT_FOUND",
            Self::InvalidTier => "INVALID_TIER",
            Self::BundleNotFound => "BUNDLE_NOT_FOUND",
            Self::VerifyFailed => "VERIFY_FAILED",
            Self::SettleFailed => "SETTLE_FAILED",
            Self::FacilitatorError => "FACILITATOR_ERROR",
            Self::FacilitatorTimeout => "FACILITATOR_TIMEOUT",
            Self::UnknownFacilitator => "UNKNOWN_FACILITATOR",
            Self::NoAcceptablePayment => "NO_ACCEPTABLE_PAYMENT",
            Self::SigningFailed => "SIGNING_FAILED",
            Self::RetriesExhausted => "RETRIES_EXHAUSTED",
            Self::BudgetCheckFailed => "BUDGET_CHECK_FAILED",
            Self::MalformedPayload => "MALFORMED_PAYLOAD",
            Self::TransportError => "TRANSPORT_ERROR",
            Self::AttestationFailed => "ATTESTATION_FAILED",
            Self::InvalidConfig => "INVALID_CONFIG",
            Self::ListingNotFound => "LISTING_NOT_FOUND",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Get a short recovery hint for this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::InvalidState => Some("Check the session status; paused sessions must be resumed."),
            Self::SessionExpired => Some("Open a new session with a fresh payment intent."),
            Self::RateLimitExceeded => Some("Wait for the retry-after interval before calling again."),
            Self::CallLimitExceeded => Some("Open a new session or choose a tier with more calls."),
            Self::BudgetExhausted => Some("Settle this session and open a new one with more budget."),
            Self::SessionNotFound => Some("The session id is unknown; it may have been pruned."),
            Self::PaymentRequired => Some("Attach a PAYMENT-SIGNATURE header built from the offered requirements."),
            Self::PaymentInvalid => Some("Rebuild the payment against the latest PAYMENT-REQUIRED challenge."),
            Self::IntentExpired => Some("Sign a new payment intent with a later creation time."),
            Self::IntentInvalid => Some("Check the intent fields and signature."),
            Self::NonceReused => Some("Use a fresh nonce for each payment intent."),
            Self::TierNotFound => Some("List the seller's tiers and pick an existing id."),
            Self::InvalidTier => Some("Fix the tier definition in the gateway configuration."),
            Self::BundleNotFound => Some("Register the bundle before pricing it."),
            Self::VerifyFailed => Some("Check payment amount, asset, and signature."),
            Self::SettleFailed => Some("Settlement can be retried out of band."),
            Self::FacilitatorError => Some("Check connectivity to the facilitator."),
            Self::FacilitatorTimeout => Some("The facilitator is slow; retry or raise the timeout."),
            Self::UnknownFacilitator => Some("Pick one of the registered facilitator ids."),
            Self::NoAcceptablePayment => Some("Widen the preferred network/asset or per-call cap."),
            Self::SigningFailed => Some("Check the wallet signer configuration."),
            Self::RetriesExhausted => Some("The seller rejected every payment; inspect its error field."),
            Self::BudgetCheckFailed => Some("Raise the buyer budget or reduce spending."),
            Self::MalformedPayload => Some("Headers must be base64-encoded JSON."),
            Self::TransportError => Some("The upstream RPC failed; no charge was applied."),
            Self::AttestationFailed => Some("Check the attestation signer."),
            Self::InvalidConfig => Some("Fix the reported configuration field."),
            Self::ListingNotFound => Some("Search the marketplace for available listings."),
            Self::InternalError => Some("An internal error occurred. Please report this issue."),
        }
    }

    /// Get the error category name.
    pub fn category(&self) -> &'static str {
        if self.is_session_error() {
            "Session"
        } else if self.is_payment_error() {
            "Payment"
        } else if self.is_facilitator_error() {
            "Facilitator"
        } else if self.is_client_error() {
            "Client"
        } else if (0x0500..=0x05FF).contains(&self.code()) {
            "Gateway"
        } else {
            "Internal"
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_ranges() {
        assert!(ErrorCode::BudgetExhausted.is_session_error());
        assert!(ErrorCode::NonceReused.is_payment_error());
        assert!(ErrorCode::FacilitatorTimeout.is_facilitator_error());
        assert!(ErrorCode::RetriesExhausted.is_client_error());
        assert!(!ErrorCode::TransportError.is_session_error());
    }

    #[test]
    fn test_categories() {
        assert_eq!(ErrorCode::SessionExpired.category(), "Session");
        assert_eq!(ErrorCode::TierNotFound.category(), "Payment");
        assert_eq!(ErrorCode::SettleFailed.category(), "Facilitator");
        assert_eq!(ErrorCode::SigningFailed.category(), "Client");
        assert_eq!(ErrorCode::TransportError.category(), "Gateway");
        assert_eq!(ErrorCode::InternalError.category(), "Internal");
    }

    #[test]
    fn test_display_matches_serde_name() {
        let code = ErrorCode::RateLimitExceeded;
        assert_eq!(code.to_string(), "RATE_LIMIT_EXCEEDED");
        assert_eq!(
            serde_json::to_string(&code).unwrap(),
            "\"RATE_LIMIT_EXCEEDED\""
        );
    }

    #[test]
    fn test_every_code_has_suggestion() {
        for code in [
            ErrorCode::InvalidState,
            ErrorCode::PaymentRequired,
            ErrorCode::UnknownFacilitator,
            ErrorCode::BudgetCheckFailed,
            ErrorCode::ListingNotFound,
        ] {
            assert!(code.suggestion().is_some());
        }
    }
}
