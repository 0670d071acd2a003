//! Error types for the gateway orchestrator.

use paygate_econ::EconError;
use paygate_market::MarketError;
use paygate_session::SessionError;
use paygate_types::ErrorCode;
use paygate_valid::AttestError;
use paygate_x402::X402Error;
use thiserror::Error;

use crate::transport::TransportError;

/// Result type for gateway operations.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Errors that can occur while serving calls.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    // =========================================================================
    // Component errors
    // =========================================================================
    /// Session pre-flight or lifecycle failure
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Pricing(#[from] EconError),

    #[error(transparent)]
    X402(#[from] X402Error),

    #[error(transparent)]
    Market(#[from] MarketError),

    #[error(transparent)]
    Attestation(#[from] AttestError),

    // =========================================================================
    // Gateway errors
    // =========================================================================
    /// No session with this id
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Intent tier is not offered
    #[error("tier not found: {0}")]
    TierNotFound(String),

    /// Intent failed validation
    #[error("payment intent rejected: {reason}")]
    IntentRejected { reason: String },

    /// Intent TTL elapsed before the session was opened
    #[error("payment intent {nonce} expired")]
    IntentExpired { nonce: String },

    /// Intent nonce already used on this gateway
    #[error("payment intent nonce reused: {0}")]
    NonceReused(String),

    /// The wrapped RPC failed; nothing was charged
    #[error("transport error on {method}: {source}")]
    Transport {
        method: String,
        session_id: Option<String>,
        #[source]
        source: TransportError,
    },

    /// Configuration invalid or unreadable
    #[error("configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Map to the shared error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Session(e) => e.code(),
            Self::Pricing(e) => e.code(),
            Self::X402(e) => e.code(),
            Self::Market(e) => e.code(),
            Self::Attestation(e) => e.code(),
            Self::SessionNotFound(_) => ErrorCode::SessionNotFound,
            Self::TierNotFound(_) => ErrorCode::TierNotFound,
            Self::IntentRejected { .. } => ErrorCode::IntentInvalid,
            Self::IntentExpired { .. } => ErrorCode::IntentExpired,
            Self::NonceReused(_) => ErrorCode::NonceReused,
            Self::Transport { .. } => ErrorCode::TransportError,
            Self::Config(_) => ErrorCode::InvalidConfig,
        }
    }

    /// The session the error belongs to, when there is one.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Session(e) => Some(e.session_id()),
            Self::SessionNotFound(id) => Some(id),
            Self::Transport { session_id, .. } => session_id.as_deref(),
            _ => None,
        }
    }

    /// Returns true if the same call may succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Session(e) => e.is_retryable(),
            Self::X402(e) => e.is_retryable(),
            Self::Transport { .. } => true,
            _ => false,
        }
    }

    /// Returns a user-friendly suggestion for recovering from this error.
    pub fn suggestion(&self) -> &'static str {
        self.code()
            .suggestion()
            .unwrap_or("This is an internal error; please report it")
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_errors_keep_session_id() {
        let err: GatewayError = SessionError::Expired {
            session_id: "sess_1".into(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::SessionExpired);
        assert_eq!(err.session_id(), Some("sess_1"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_transport_is_retryable() {
        let err = GatewayError::Transport {
            method: "getSlot".into(),
            session_id: Some("sess_2".into()),
            source: TransportError::new("connection reset"),
        };
        assert!(err.is_retryable());
        assert_eq!(err.code(), ErrorCode::TransportError);
        assert_eq!(err.to_string(), "transport error on getSlot: connection reset");
    }
}
