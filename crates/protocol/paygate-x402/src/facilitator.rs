//! x402 facilitator client.
//!
//! The facilitator is a third-party service that verifies signed payments and
//! submits them on-chain. The gateway reaches it over three endpoints:
//! - `GET /supported`: scheme/network pairs plus extras such as `feePayer`
//! - `POST /verify`: check a payment without moving funds
//! - `POST /settle`: submit the payment
//!
//! Every call is bounded by a timeout; a call that exceeds it is dropped and
//! reported as [`X402Error::Timeout`].

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use paygate_types::DEFAULT_FACILITATOR_TIMEOUT_SECS;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{X402Error, X402Result};
use crate::types::{
    FacilitatorRequest, PaymentPayload, PaymentRequirements, SettleResponse, SupportedResponse,
    VerifyResponse, X402_VERSION,
};

/// Largest integer a JSON number can carry without precision loss in
/// double-based parsers (2^53 - 1).
pub const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

/// Something that can verify and settle x402 payments.
///
/// Implemented by [`FacilitatorClient`] over HTTP; tests substitute an
/// in-memory mock.
#[async_trait]
pub trait Facilitator: Send + Sync {
    /// Scheme/network pairs the facilitator handles.
    async fn supported(&self) -> X402Result<SupportedResponse>;

    /// Verify a payment. Returns `Ok` only for a valid payment.
    async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> X402Result<VerifyResponse>;

    /// Settle a payment. Returns `Ok` only when settlement succeeded.
    async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> X402Result<SettleResponse>;
}

/// Connection settings for a facilitator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FacilitatorConfig {
    /// Base URL, e.g. `https://x402.org/facilitator`.
    pub url: String,
    pub timeout_secs: u64,
    /// Sent as `Authorization: Bearer <key>` when set.
    pub api_key: Option<String>,
    /// Extra static headers sent with every request.
    pub headers: HashMap<String, String>,
}

impl Default for FacilitatorConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: DEFAULT_FACILITATOR_TIMEOUT_SECS,
            api_key: None,
            headers: HashMap::new(),
        }
    }
}

impl FacilitatorConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// HTTP client for an x402 facilitator.
#[derive(Clone)]
pub struct FacilitatorClient {
    /// HTTP client
    client: Client,
    /// Base URL without trailing slash
    base_url: String,
    timeout: Duration,
    api_key: Option<String>,
    headers: HashMap<String, String>,
}

impl FacilitatorClient {
    /// Create a client with the default timeout.
    pub fn new(facilitator_url: &str) -> X402Result<Self> {
        Self::from_config(&FacilitatorConfig::new(facilitator_url))
    }

    /// Create a client from a config.
    pub fn from_config(config: &FacilitatorConfig) -> X402Result<Self> {
        let url = config.url.trim();
        if url.is_empty() {
            return Err(X402Error::InvalidConfig("facilitator url is empty".into()));
        }
        let client = Client::builder()
            .build()
            .map_err(|e| X402Error::Facilitator(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
            api_key: config.api_key.clone(),
            headers: config.headers.clone(),
        })
    }

    /// Get the facilitator's base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        let mut builder = builder;
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }

    /// Run `fut` under the client timeout.
    async fn guarded<T>(
        &self,
        endpoint: &str,
        fut: impl Future<Output = X402Result<T>>,
    ) -> X402Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(endpoint, timeout_secs = self.timeout.as_secs(), "Facilitator request timed out");
                Err(X402Error::Timeout {
                    endpoint: endpoint.to_string(),
                    timeout_secs: self.timeout.as_secs(),
                })
            }
        }
    }

    /// POST a verify/settle body and return status plus raw body text.
    async fn post(
        &self,
        endpoint: &str,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> X402Result<(reqwest::StatusCode, String)> {
        let url = format!("{}{}", self.base_url, endpoint);
        let body = FacilitatorRequest {
            x402_version: X402_VERSION,
            payment_payload: payload.clone(),
            payment_requirements: requirements.clone(),
        };
        let body = serde_json::to_value(&body)
            .map_err(|e| X402Error::Facilitator(format!("failed to encode request: {e}")))?;
        let body = stringify_large_numbers(body);

        self.guarded(endpoint, async {
            let response = self.request(self.client.post(&url)).json(&body).send().await?;
            let status = response.status();
            let text = response.text().await?;
            Ok((status, text))
        })
        .await
    }
}

#[async_trait]
impl Facilitator for FacilitatorClient {
    async fn supported(&self) -> X402Result<SupportedResponse> {
        let url = format!("{}/supported", self.base_url);
        debug!(url = %url, "Querying facilitator supported kinds");

        let (status, text) = self
            .guarded("/supported", async {
                let response = self.request(self.client.get(&url)).send().await?;
                let status = response.status();
                Ok((status, response.text().await?))
            })
            .await?;

        if !status.is_success() {
            return Err(X402Error::Facilitator(format!(
                "facilitator /supported returned {status}: {text}"
            )));
        }

        let supported: SupportedResponse = serde_json::from_str(&text).map_err(|e| {
            X402Error::Facilitator(format!("failed to parse supported response: {e}"))
        })?;
        debug!(kinds = supported.kinds.len(), "Facilitator supported kinds loaded");
        Ok(supported)
    }

    async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> X402Result<VerifyResponse> {
        debug!(network = %requirements.network, amount = %requirements.amount, "Verifying payment with facilitator");
        let (status, text) = self.post("/verify", payload, requirements).await?;

        if !status.is_success() {
            return Err(X402Error::Verify {
                reason: format!("facilitator returned {status}"),
                body: Some(text),
            });
        }

        let verify: VerifyResponse = serde_json::from_str(&text).map_err(|e| X402Error::Verify {
            reason: format!("failed to parse verify response: {e}"),
            body: Some(text.clone()),
        })?;

        if !verify.is_valid {
            warn!(reason = ?verify.invalid_reason, "Payment verification failed");
            return Err(X402Error::Verify {
                reason: verify
                    .invalid_reason
                    .clone()
                    .unwrap_or_else(|| "payment invalid".to_string()),
                body: Some(text),
            });
        }

        debug!(payer = ?verify.payer, "Payment verified");
        Ok(verify)
    }

    async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> X402Result<SettleResponse> {
        debug!(network = %requirements.network, amount = %requirements.amount, "Settling payment with facilitator");
        let (status, text) = self.post("/settle", payload, requirements).await?;

        if !status.is_success() {
            return Err(X402Error::Settle {
                reason: format!("facilitator returned {status}"),
                body: Some(text),
            });
        }

        let settle: SettleResponse = serde_json::from_str(&text).map_err(|e| X402Error::Settle {
            reason: format!("failed to parse settle response: {e}"),
            body: Some(text.clone()),
        })?;

        if !settle.success {
            warn!(reason = ?settle.error_reason, "Payment settlement failed");
            return Err(X402Error::Settle {
                reason: settle
                    .error_reason
                    .clone()
                    .unwrap_or_else(|| "settlement unsuccessful".to_string()),
                body: Some(text),
            });
        }

        info!(
            transaction = ?settle.transaction,
            network = ?settle.network,
            "Payment settled"
        );
        Ok(settle)
    }
}

impl std::fmt::Debug for FacilitatorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacilitatorClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Replace integers outside `±MAX_SAFE_INTEGER` with their decimal strings.
///
/// Applied to every outgoing facilitator body so JavaScript-based
/// facilitators do not round large token amounts.
pub fn stringify_large_numbers(value: Value) -> Value {
    match value {
        Value::Number(n) => {
            let too_large = match (n.as_u64(), n.as_i64()) {
                (Some(u), _) => u > MAX_SAFE_INTEGER,
                (None, Some(i)) => i.unsigned_abs() > MAX_SAFE_INTEGER,
                (None, None) => false,
            };
            if too_large {
                Value::String(n.to_string())
            } else {
                Value::Number(n)
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(stringify_large_numbers).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, stringify_large_numbers(v)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_url_normalization() {
        let client = FacilitatorClient::new("https://x402.org/facilitator/").unwrap();
        assert_eq!(client.base_url(), "https://x402.org/facilitator");
        assert_eq!(client.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_empty_url_rejected() {
        assert!(matches!(
            FacilitatorClient::new("  "),
            Err(X402Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let client =
            FacilitatorClient::from_config(&FacilitatorConfig::new("https://f.example").with_api_key("secret"))
                .unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_stringify_large_numbers() {
        let input = json!({
            "small": 1000,
            "edge": MAX_SAFE_INTEGER,
            "big": MAX_SAFE_INTEGER + 1,
            "negative": -9_007_199_254_740_993i64,
            "nested": [{"amount": u64::MAX}, 1.5, "text"]
        });
        let out = stringify_large_numbers(input);
        assert_eq!(out["small"], 1000);
        assert_eq!(out["edge"], MAX_SAFE_INTEGER);
        assert_eq!(out["big"], "9007199254740992");
        assert_eq!(out["negative"], "-9007199254740993");
        assert_eq!(out["nested"][0]["amount"], u64::MAX.to_string());
        assert_eq!(out["nested"][1], 1.5);
        assert_eq!(out["nested"][2], "text");
    }
}
