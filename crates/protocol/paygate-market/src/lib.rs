//! Tool discovery for the paygate gateway.
//!
//! Sellers publish [`ToolListing`]s keyed by `(method, seller_id)`; buyers
//! find them with a [`SearchQuery`]. Attestation reports feed a per-seller
//! [`ReputationRecord`] whose score is written back onto every listing the
//! seller owns.

pub mod error;
pub mod listing;
pub mod marketplace;
pub mod query;
pub mod reputation;

pub use error::{MarketError, MarketResult};
pub use listing::ToolListing;
pub use marketplace::ToolMarketplace;
pub use query::{MethodMatch, SearchQuery, SortField, SortOrder};
pub use reputation::ReputationRecord;
