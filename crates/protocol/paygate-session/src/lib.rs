//! Per-buyer session metering for the paygate gateway.
//!
//! An [`AgentSession`] binds one buyer, one seller, one tier and one payment
//! intent. It enforces TTL, a sliding-window rate limit, a per-session call
//! allowance and a budget, and publishes lifecycle events on an
//! [`EventBus`](paygate_types::EventBus).
//!
//! # State machine
//!
//! ```text
//! pending --activate--> active <--pause/resume--> paused
//!                          |
//!                          +--> expired | exhausted | settled
//! ```
//!
//! # Example
//!
//! ```
//! use paygate_session::{AgentSession, SessionConfig, SessionStatus};
//! use paygate_types::{AgentIdentity, PaymentIntent, PricingTier};
//!
//! let intent = PaymentIntent {
//!     nonce: "n-1".into(),
//!     buyer: AgentIdentity::new("buyer", "Buyer", "0xb"),
//!     seller: AgentIdentity::new("seller", "Seller", "0xs"),
//!     tier_id: "basic".into(),
//!     max_budget: 5_000,
//!     token: "USDC".into(),
//!     signature: String::new(),
//!     created_at: paygate_types::now_ms(),
//!     ttl: 300,
//! };
//! let tier = PricingTier::new("basic", "Basic", 1_000);
//!
//! let mut session = AgentSession::new(&intent, tier, SessionConfig::default());
//! session.activate().unwrap();
//!
//! let cost = session.pre_call("getSlot").unwrap();
//! session.post_call("getSlot", cost).unwrap();
//!
//! let summary = session.settle();
//! assert_eq!(summary.amount_charged, 1_000);
//! assert_eq!(session.status(), SessionStatus::Settled);
//! ```

pub mod config;
pub mod error;
pub mod rate_limit;
pub mod session;
pub mod state;
pub mod status;

pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};
pub use rate_limit::RateLimiter;
pub use session::{generate_session_id, AgentSession};
pub use state::{SessionState, UsageSummary};
pub use status::SessionStatus;
