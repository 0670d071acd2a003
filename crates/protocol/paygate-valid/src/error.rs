//! Attestation error types.

use paygate_crypto::CryptoError;
use paygate_types::ErrorCode;
use thiserror::Error;

/// Errors raised while producing attestations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttestError {
    /// The configured signer failed
    #[error("attestation signing failed: {0}")]
    Signing(#[from] CryptoError),
}

impl AttestError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::AttestationFailed
    }
}

/// Result type for attestation operations.
pub type AttestResult<T> = std::result::Result<T, AttestError>;
