//! Error types for the x402 payment handshake.

use paygate_types::{Amount, ErrorCode};
use thiserror::Error;

/// Result type for x402 operations.
pub type X402Result<T> = Result<T, X402Error>;

/// Errors that can occur during x402 payment operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum X402Error {
    // =========================================================================
    // Facilitator
    // =========================================================================
    /// Facilitator rejected the payment or answered /verify with non-2xx.
    #[error("payment verification failed: {reason}")]
    Verify {
        /// Why the payment was rejected
        reason: String,
        /// Raw facilitator response body, for diagnostics
        body: Option<String>,
    },

    /// Facilitator could not settle the payment.
    #[error("payment settlement failed: {reason}")]
    Settle {
        /// Why settlement failed
        reason: String,
        /// Raw facilitator response body, for diagnostics
        body: Option<String>,
    },

    /// Network or protocol error talking to the facilitator.
    #[error("facilitator error: {0}")]
    Facilitator(String),

    /// Facilitator did not answer within the configured timeout.
    #[error("facilitator {endpoint} timed out after {timeout_secs}s")]
    Timeout {
        /// Endpoint path, e.g. "/verify"
        endpoint: String,
        /// Configured timeout
        timeout_secs: u64,
    },

    /// Facilitator id not in the registry.
    #[error("unknown facilitator '{id}', expected one of: {}", .known.join(", "))]
    UnknownFacilitator {
        /// Requested id
        id: String,
        /// Registered ids
        known: Vec<String>,
    },

    // =========================================================================
    // Payload
    // =========================================================================
    /// Header or payload could not be decoded.
    #[error("malformed payment payload: {reason}")]
    MalformedPayload {
        /// Description of what's wrong
        reason: String,
    },

    // =========================================================================
    // Buyer client
    // =========================================================================
    /// No offered requirement passes the selector.
    #[error("no acceptable payment option among {offered} offered")]
    NoAcceptablePayment {
        /// Number of requirements the seller offered
        offered: usize,
    },

    /// The injected signer failed.
    #[error("payment signing failed: {0}")]
    Signing(String),

    /// The seller kept answering 402.
    #[error("payment rejected after {attempts} attempts{}", .last_error.as_deref().map(|e| format!(": {e}")).unwrap_or_default())]
    RetriesExhausted {
        /// Paid attempts made
        attempts: u32,
        /// Error reported by the last 402, if any
        last_error: Option<String>,
    },

    /// The budget check refused the payment.
    #[error("payment of {amount} refused by budget check (spent {spent})")]
    BudgetExceeded {
        /// Amount the seller asked for
        amount: Amount,
        /// Amount already spent by this client
        spent: Amount,
    },

    /// HTTP error talking to the seller.
    #[error("transport error: {0}")]
    Transport(String),

    /// Configuration rejected.
    #[error("invalid x402 configuration: {0}")]
    InvalidConfig(String),
}

impl X402Error {
    /// Map to the shared error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Verify { .. } => ErrorCode::VerifyFailed,
            Self::Settle { .. } => ErrorCode::SettleFailed,
            Self::Facilitator(_) => ErrorCode::FacilitatorError,
            Self::Timeout { .. } => ErrorCode::FacilitatorTimeout,
            Self::UnknownFacilitator { .. } => ErrorCode::UnknownFacilitator,
            Self::MalformedPayload { .. } => ErrorCode::MalformedPayload,
            Self::NoAcceptablePayment { .. } => ErrorCode::NoAcceptablePayment,
            Self::Signing(_) => ErrorCode::SigningFailed,
            Self::RetriesExhausted { .. } => ErrorCode::RetriesExhausted,
            Self::BudgetExceeded { .. } => ErrorCode::BudgetCheckFailed,
            Self::Transport(_) => ErrorCode::TransportError,
            Self::InvalidConfig(_) => ErrorCode::InvalidConfig,
        }
    }

    /// Returns a user-friendly suggestion for recovering from this error.
    pub fn suggestion(&self) -> &'static str {
        self.code()
            .suggestion()
            .unwrap_or("This is an internal error; please report it")
    }

    /// Returns true if the operation may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Facilitator(_) | Self::Timeout { .. } | Self::Transport(_)
        )
    }

    /// HTTP status a seller should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Verify { .. } | Self::MalformedPayload { .. } => 402,
            Self::Facilitator(_) | Self::Settle { .. } => 502,
            Self::Timeout { .. } => 504,
            _ => 500,
        }
    }

    /// Facilitator response body attached to the error, if any.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Verify { body, .. } | Self::Settle { body, .. } => body.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for X402Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Facilitator(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_facilitator_lists_ids() {
        let err = X402Error::UnknownFacilitator {
            id: "nope".into(),
            known: vec!["x402-org".into(), "payai".into()],
        };
        assert_eq!(
            err.to_string(),
            "unknown facilitator 'nope', expected one of: x402-org, payai"
        );
    }

    #[test]
    fn test_retries_exhausted_display() {
        let err = X402Error::RetriesExhausted {
            attempts: 3,
            last_error: Some("insufficient_funds".into()),
        };
        assert_eq!(
            err.to_string(),
            "payment rejected after 3 attempts: insufficient_funds"
        );
        let err = X402Error::RetriesExhausted {
            attempts: 1,
            last_error: None,
        };
        assert_eq!(err.to_string(), "payment rejected after 1 attempts");
    }

    #[test]
    fn test_error_retryable() {
        assert!(X402Error::Facilitator("connection reset".into()).is_retryable());
        assert!(X402Error::Timeout {
            endpoint: "/verify".into(),
            timeout_secs: 30
        }
        .is_retryable());
        assert!(!X402Error::Signing("no key".into()).is_retryable());
    }

    #[test]
    fn test_error_codes_and_status() {
        let err = X402Error::Verify {
            reason: "insufficient_funds".into(),
            body: Some("{\"isValid\":false}".into()),
        };
        assert_eq!(err.code(), ErrorCode::VerifyFailed);
        assert_eq!(err.http_status(), 402);
        assert_eq!(err.body(), Some("{\"isValid\":false}"));
        assert!(!err.suggestion().is_empty());
    }
}
