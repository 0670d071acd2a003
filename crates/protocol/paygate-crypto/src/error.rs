//! Error types for paygate-crypto

use paygate_types::ErrorCode;
use thiserror::Error;

/// Result type for cryptographic operations.
pub type CryptoResult<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Input was not valid hex
    #[error("Invalid hex encoding: {0}")]
    InvalidHex(String),

    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// The signer could not produce a signature
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,
}

impl CryptoError {
    /// Map to the shared error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::SigningFailed(_) => ErrorCode::AttestationFailed,
            Self::SignatureVerificationFailed => ErrorCode::IntentInvalid,
            Self::InvalidHex(_) | Self::InvalidKeyLength { .. } => ErrorCode::InvalidConfig,
        }
    }
}

impl From<hex::FromHexError> for CryptoError {
    fn from(err: hex::FromHexError) -> Self {
        CryptoError::InvalidHex(err.to_string())
    }
}
