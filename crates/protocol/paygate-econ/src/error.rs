//! Pricing error types.

use paygate_types::ErrorCode;
use thiserror::Error;

/// Errors raised by the pricing engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EconError {
    /// Tier id does not resolve
    #[error("tier not found: {0}")]
    TierNotFound(String),

    /// Bundle id does not resolve
    #[error("bundle not found: {0}")]
    BundleNotFound(String),

    /// Tier definition rejected
    #[error("invalid tier '{tier_id}': {reason}")]
    InvalidTier {
        /// Offending tier
        tier_id: String,
        /// What is wrong with it
        reason: String,
    },

    /// Cost does not fit in an amount
    #[error("cost overflow: {per_call} x {calls}")]
    Overflow {
        /// Price of one call
        per_call: u64,
        /// Number of calls
        calls: u64,
    },
}

impl EconError {
    /// Map to the shared error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::TierNotFound(_) => ErrorCode::TierNotFound,
            Self::BundleNotFound(_) => ErrorCode::BundleNotFound,
            Self::InvalidTier { .. } => ErrorCode::InvalidTier,
            Self::Overflow { .. } => ErrorCode::InternalError,
        }
    }
}

/// Result type for pricing operations.
pub type EconResult<T> = std::result::Result<T, EconError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EconError::TierNotFound("gold".into());
        assert!(err.to_string().contains("gold"));

        let err = EconError::InvalidTier {
            tier_id: "t".into(),
            reason: "rate limit must be positive".into(),
        };
        assert!(err.to_string().contains("rate limit"));
        assert_eq!(err.code(), ErrorCode::InvalidTier);
    }
}
