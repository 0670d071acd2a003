//! The wrapped RPC transport.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failure reported by the underlying RPC.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    /// Upstream error code, when the RPC returned one.
    pub code: Option<i64>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }
}

/// Performs the metered operation.
///
/// The gateway treats every method as opaque; it never inspects params or
/// results beyond hashing them for attestation.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn request(&self, method: &str, params: &Value) -> Result<Value, TransportError>;
}
