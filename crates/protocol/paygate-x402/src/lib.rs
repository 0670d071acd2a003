//! x402 Payment Required integration for the paygate gateway.
//!
//! Three roles share the wire types in [`types`]:
//!
//! ```text
//! ┌────────────┐  call            ┌────────────┐  /verify   ┌─────────────┐
//! │   Buyer    │ ───────────────→ │  Paywall   │ ─────────→ │ Facilitator │
//! │ X402Client │ ←─── 402 ─────── │  (seller)  │            │             │
//! │            │  call + PAYMENT- │            │  /settle   │             │
//! │            │  SIGNATURE       │            │ ─────────→ │             │
//! │            │ ───────────────→ │            │            │             │
//! │            │ ←── 200 + PAY-   │            │            │             │
//! │            │  MENT-RESPONSE   │            │            │             │
//! └────────────┘                  └────────────┘            └─────────────┘
//! ```
//!
//! - **[`paywall`]**: seller-side gate issuing challenges and settling
//! - **[`client`]**: buyer-side wrapper paying 402 answers transparently
//! - **[`facilitator`]**: HTTP client for `/supported`, `/verify`, `/settle`
//! - **[`registry`]**: well-known facilitators
//! - **[`error`]**: error types with recovery suggestions
//!
//! # Seller example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use http::HeaderMap;
//! use paygate_x402::{FacilitatorClient, Paywall, PaywallConfig, PaywallOutcome};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let facilitator = Arc::new(FacilitatorClient::new("https://x402.org/facilitator")?);
//! let config = PaywallConfig::new("eip155:84532", "USDC", "1000", "0xSeller");
//! let paywall = Paywall::new(config, facilitator);
//!
//! match paywall.process_request("getSlot", &HeaderMap::new()).await {
//!     PaywallOutcome::PaymentRequired(challenge) => {
//!         // answer 402 with challenge.header in PAYMENT-REQUIRED
//!     }
//!     PaywallOutcome::PaymentValid(payment) => {
//!         // serve, then
//!         let _ = paywall
//!             .settle_after_response(&payment.payload, &payment.requirements)
//!             .await;
//!     }
//!     PaywallOutcome::NoPaymentNeeded => {}
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod facilitator;
pub mod paywall;
pub mod registry;
pub mod types;

pub use client::{
    select_cheapest, BudgetCheck, ExchangeRequest, ExchangeResponse, HttpExchange,
    PaymentRecord, PaymentSigner, RequirementSelector, ReqwestExchange, X402Client,
    X402ClientConfig,
};
pub use error::{X402Error, X402Result};
pub use facilitator::{
    stringify_large_numbers, Facilitator, FacilitatorClient, FacilitatorConfig,
};
pub use paywall::{
    header_name, payment_response_header, LocalVerifier, PaymentChallenge, Paywall,
    PaywallConfig, PaywallOutcome, RouteOverride, SettleOutcome, VerifiedPayment,
};
pub use registry::{
    known_facilitator, list_known_facilitators, networks, resolve_known_facilitator,
    FacilitatorOverrides, KnownFacilitator,
};
pub use types::{
    decode_header, encode_header, FacilitatorRequest, PaymentPayload, PaymentRequired,
    PaymentRequirements, ResourceInfo, SettleResponse, SettlementSummary, SupportedKind,
    SupportedResponse, VerifyResponse, HEADER_PAYMENT_REQUIRED, HEADER_PAYMENT_RESPONSE,
    HEADER_PAYMENT_SIGNATURE, SCHEME_EXACT, X402_VERSION,
};
