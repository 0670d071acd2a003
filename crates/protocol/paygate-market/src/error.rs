//! Marketplace error types.

use paygate_types::ErrorCode;
use thiserror::Error;

/// Errors raised by the marketplace.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarketError {
    /// No listing for this method/seller pair
    #[error("no listing for {method} by {seller_id}")]
    ListingNotFound {
        /// Listed method
        method: String,
        /// Owning seller
        seller_id: String,
    },

    /// Bundle id not registered
    #[error("bundle not found: {0}")]
    BundleNotFound(String),

    /// Listing or bundle rejected before insertion
    #[error("invalid listing: {0}")]
    InvalidListing(String),
}

impl MarketError {
    /// Map to the shared error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ListingNotFound { .. } => ErrorCode::ListingNotFound,
            Self::BundleNotFound(_) => ErrorCode::BundleNotFound,
            Self::InvalidListing(_) => ErrorCode::InvalidConfig,
        }
    }
}

/// Result type for marketplace operations.
pub type MarketResult<T> = std::result::Result<T, MarketError>;
