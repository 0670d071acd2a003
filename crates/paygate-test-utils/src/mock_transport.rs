//! Mock implementation of the `RpcTransport` trait for testing.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use paygate_ops::{RpcTransport, TransportError};
use serde_json::{json, Value};

#[derive(Default)]
struct MockTransportInner {
    responses: HashMap<String, Value>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    calls: Vec<(String, Value)>,
}

/// A scripted RPC transport.
///
/// Unscripted methods answer `{"context": {"slot": <n>}, "value": <method>}`
/// where `n` is the 1-based call number. Clones share state.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<RwLock<MockTransportInner>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method` with `response`.
    pub fn with_response(self, method: &str, response: Value) -> Self {
        self.inner
            .write()
            .unwrap()
            .responses
            .insert(method.to_string(), response);
        self
    }

    /// Sleep before every answer.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.inner.write().unwrap().delay = Some(delay);
        self
    }

    /// Make `method` fail (or succeed again).
    pub fn set_failing(&self, method: &str, failing: bool) {
        let mut inner = self.inner.write().unwrap();
        if failing {
            inner.failing.insert(method.to_string());
        } else {
            inner.failing.remove(method);
        }
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.inner.read().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.read().unwrap().calls.len()
    }
}

#[async_trait]
impl RpcTransport for MockTransport {
    async fn request(&self, method: &str, params: &Value) -> Result<Value, TransportError> {
        let delay = self.inner.read().unwrap().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.write().unwrap();
        inner.calls.push((method.to_string(), params.clone()));
        if inner.failing.contains(method) {
            return Err(TransportError::new(format!("{method} unavailable")).with_code(-32603));
        }
        let slot = inner.calls.len();
        Ok(inner
            .responses
            .get(method)
            .cloned()
            .unwrap_or_else(|| json!({ "context": { "slot": slot }, "value": method })))
    }
}
