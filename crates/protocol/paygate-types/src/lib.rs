//! Data structures for the paygate agent commerce gateway.
//!
//! This crate holds the types shared by every other paygate crate. It carries
//! no business logic beyond small helpers on the types themselves.
//!
//! # Module Organization
//!
//! - [`constants`] - Defaults and limits (rate windows, ring capacity, TTLs)
//! - [`error`] - Machine-readable error codes shared across crates
//! - [`identity`] - Seller / buyer identities
//! - [`tier`] - Pricing tiers
//! - [`bundle`] - Discounted method bundles
//! - [`intent`] - Signed payment intents that open sessions
//! - [`clock`] - Time source abstraction
//! - [`events`] - Typed gateway events and the synchronous event bus
//!
//! # Example
//!
//! ```
//! use paygate_types::{AgentIdentity, PricingTier};
//!
//! let seller = AgentIdentity::new("seller-1", "Acme RPC", "0xabc");
//! let tier = PricingTier::new("basic", "Basic", 1_000).with_rate_limit(10);
//!
//! assert_eq!(seller.id, "seller-1");
//! assert!(!tier.is_free());
//! assert!(tier.is_unlimited());
//! ```

/// Crate version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod bundle;
pub mod clock;
pub mod constants;
pub mod error;
pub mod events;
pub mod identity;
pub mod intent;
pub mod tier;

pub use bundle::ToolBundle;
pub use clock::{now_ms, Clock, SharedClock, SystemClock};
pub use constants::*;
pub use error::ErrorCode;
pub use events::{EventBus, EventHandler, EventKind, ExhaustionReason, GatewayEvent, SubscriptionId};
pub use identity::AgentIdentity;
pub use intent::PaymentIntent;
pub use tier::PricingTier;

/// Monetary amount in the smallest currency unit.
///
/// All prices and budgets use integer arithmetic; no floating point value is
/// ever stored as an amount.
pub type Amount = u64;
