//! Gateway orchestration for paygate.
//!
//! This crate wires the protocol crates into a serving [`Gateway`]:
//!
//! - **[`gateway`]**: session-metered calls and x402-paid calls
//! - **[`config`]**: TOML configuration with `${VAR}` expansion
//! - **[`transport`]**: the [`RpcTransport`] collaborator performing the call
//! - **[`logging`]**: tracing subscriber setup for hosts
//! - **[`error`]**: the aggregate [`GatewayError`]
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use paygate_ops::{Gateway, GatewayConfig, RpcTransport};
//!
//! # async fn example(transport: Arc<dyn RpcTransport>, intent: paygate_types::PaymentIntent)
//! # -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::load(std::path::Path::new("paygate.toml"))?;
//! let gateway = Gateway::from_config(config, transport)?;
//!
//! let session_id = gateway.open_session(&intent).await?;
//! let outcome = gateway
//!     .call(&session_id, "getSlot", serde_json::json!([]))
//!     .await?;
//! println!("charged {} ({} left)", outcome.cost, outcome.budget_remaining);
//!
//! let summary = gateway.settle_session(&session_id).await?;
//! println!("total {}", summary.amount_charged);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod transport;

pub use config::{AttestationConfig, GatewayConfig, MethodConfig, SellerConfig, X402Settings};
pub use error::{GatewayError, GatewayResult};
pub use gateway::{CallOutcome, Gateway, X402Response};
pub use logging::init_tracing;
pub use transport::{RpcTransport, TransportError};
