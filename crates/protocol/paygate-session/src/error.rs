//! Session error types.
//!
//! Every session error is raised before the wrapped operation runs or any
//! charge is applied, so callers never need to compensate.

use paygate_types::{Amount, ErrorCode};
use thiserror::Error;

use crate::status::SessionStatus;

/// Errors raised by [`AgentSession`](crate::AgentSession).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    /// Operation not allowed in the current state
    #[error("session {session_id}: cannot {operation} while {status}")]
    InvalidState {
        session_id: String,
        status: SessionStatus,
        operation: &'static str,
    },

    /// Session TTL elapsed
    #[error("session {session_id} expired")]
    Expired { session_id: String },

    /// Rate window is full
    #[error("session {session_id} rate limited, retry after {retry_after_ms}ms")]
    RateLimited {
        session_id: String,
        retry_after_ms: u64,
    },

    /// Call allowance used up
    #[error("session {session_id} call limit reached")]
    CallLimitExceeded { session_id: String },

    /// Budget cannot cover the call
    #[error("session {session_id} budget exhausted: need {required}, have {remaining}")]
    BudgetExhausted {
        session_id: String,
        required: Amount,
        remaining: Amount,
    },
}

impl SessionError {
    /// Map to the shared error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidState { .. } => ErrorCode::InvalidState,
            Self::Expired { .. } => ErrorCode::SessionExpired,
            Self::RateLimited { .. } => ErrorCode::RateLimitExceeded,
            Self::CallLimitExceeded { .. } => ErrorCode::CallLimitExceeded,
            Self::BudgetExhausted { .. } => ErrorCode::BudgetExhausted,
        }
    }

    /// The session the error belongs to.
    pub fn session_id(&self) -> &str {
        match self {
            Self::InvalidState { session_id, .. }
            | Self::Expired { session_id }
            | Self::RateLimited { session_id, .. }
            | Self::CallLimitExceeded { session_id }
            | Self::BudgetExhausted { session_id, .. } => session_id,
        }
    }

    /// Milliseconds to wait before retrying, for rate-limit errors.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_ms, .. } => Some(*retry_after_ms),
            _ => None,
        }
    }

    /// Only rate limiting clears on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Result type for session operations.
pub type SessionResult<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata() {
        let err = SessionError::RateLimited {
            session_id: "sess_1".into(),
            retry_after_ms: 120,
        };
        assert_eq!(err.code(), ErrorCode::RateLimitExceeded);
        assert_eq!(err.session_id(), "sess_1");
        assert_eq!(err.retry_after_ms(), Some(120));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("120ms"));
    }

    #[test]
    fn test_invalid_state_display() {
        let err = SessionError::InvalidState {
            session_id: "sess_2".into(),
            status: SessionStatus::Paused,
            operation: "call",
        };
        assert_eq!(err.to_string(), "session sess_2: cannot call while paused");
        assert!(!err.is_retryable());
    }
}
