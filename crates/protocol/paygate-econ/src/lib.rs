//! Dynamic pricing for the paygate gateway.
//!
//! - **Tier resolution**: default tier table plus per-method overrides
//! - **Congestion pricing**: EMA of reported latencies drives a bounded surge
//!   multiplier; free tiers are never surcharged
//! - **Bundles**: flat discount on multi-call bundle sessions
//!
//! All prices are integers in the smallest currency unit and every fractional
//! intermediate is rounded up so the seller is never under-charged.
//!
//! # Example
//!
//! ```
//! use paygate_econ::{PricingConfig, PricingEngine};
//! use paygate_types::PricingTier;
//!
//! let engine = PricingEngine::with_tiers(
//!     PricingConfig::default(),
//!     vec![PricingTier::new("basic", "Basic", 1_000)],
//! )
//! .unwrap();
//!
//! let tier = engine.get_tier("basic", None).unwrap();
//! assert_eq!(engine.compute_call_price(&tier), 1_000);
//!
//! // Sustained 2s latency against a 500ms threshold triggers the 3x cap
//! engine.report_latency(2_000.0);
//! assert_eq!(engine.compute_call_price(&tier), 3_000);
//! ```

pub mod config;
pub mod congestion;
pub mod engine;
pub mod error;
pub mod tier;

pub use config::PricingConfig;
pub use congestion::{congestion_multiplier, LatencyEma};
pub use engine::PricingEngine;
pub use error::{EconError, EconResult};
pub use tier::validate_tier;
