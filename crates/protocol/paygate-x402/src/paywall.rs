//! Seller-side x402 paywall.
//!
//! The paywall decides, per request, whether a call may proceed:
//! 1. x402 disabled, or the route is free: no payment needed
//! 2. No `PAYMENT-SIGNATURE` header: answer 402 with the requirements
//! 3. Header present: decode, match against the offered requirements, verify
//! 4. Invalid payment: answer 402 again, carrying the rejection reason
//! 5. Valid payment: let the call run, then settle
//!
//! Facilitator failures never escape as errors. Verification problems turn
//! into a fresh 402 (no proof, no service); settlement problems are reported
//! in [`SettleOutcome`] for reconciliation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use paygate_types::{
    EventBus, GatewayEvent, DEFAULT_MAX_TIMEOUT_SECONDS, SUPPORTED_CACHE_TTL_SECS,
    SUPPORTED_RETRY_BACKOFF_SECS,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::{X402Error, X402Result};
use crate::facilitator::Facilitator;
use crate::types::{
    decode_header, encode_header, PaymentPayload, PaymentRequired, PaymentRequirements,
    ResourceInfo, SettleResponse, SettlementSummary, SupportedResponse, VerifyResponse,
    HEADER_PAYMENT_REQUIRED, HEADER_PAYMENT_RESPONSE, HEADER_PAYMENT_SIGNATURE, SCHEME_EXACT,
    X402_VERSION,
};

// =============================================================================
// Configuration
// =============================================================================

/// Per-method adjustments to the default requirements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RouteOverride {
    /// Price in smallest units; `"0"` makes the route free.
    pub price: Option<String>,
    pub network: Option<String>,
    pub asset: Option<String>,
    pub pay_to: Option<String>,
    pub max_timeout_seconds: Option<u64>,
    pub description: Option<String>,
}

/// Seller-side x402 settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaywallConfig {
    pub enabled: bool,
    /// CAIP-2 network id.
    pub network: String,
    /// Asset address or symbol.
    pub asset: String,
    /// Default price per call in smallest units, as a decimal string.
    pub default_price: String,
    /// Address receiving payments.
    pub pay_to: String,
    pub max_timeout_seconds: u64,
    /// Prefix turning a method name into a resource URL.
    pub resource_prefix: String,
    pub mime_type: String,
    /// Method name -> override.
    pub routes: HashMap<String, RouteOverride>,
}

impl Default for PaywallConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            network: String::new(),
            asset: String::new(),
            default_price: "0".to_string(),
            pay_to: String::new(),
            max_timeout_seconds: DEFAULT_MAX_TIMEOUT_SECONDS,
            resource_prefix: "rpc://".to_string(),
            mime_type: "application/json".to_string(),
            routes: HashMap::new(),
        }
    }
}

impl PaywallConfig {
    /// Enabled config charging `default_price` on every method.
    pub fn new(
        network: impl Into<String>,
        asset: impl Into<String>,
        default_price: impl Into<String>,
        pay_to: impl Into<String>,
    ) -> Self {
        Self {
            enabled: true,
            network: network.into(),
            asset: asset.into(),
            default_price: default_price.into(),
            pay_to: pay_to.into(),
            ..Default::default()
        }
    }

    pub fn with_route(mut self, method: impl Into<String>, route: RouteOverride) -> Self {
        self.routes.insert(method.into(), route);
        self
    }

    pub fn with_max_timeout_seconds(mut self, secs: u64) -> Self {
        self.max_timeout_seconds = secs;
        self
    }

    /// Reject configs that cannot produce a usable challenge.
    pub fn validate(&self) -> X402Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.pay_to.trim().is_empty() {
            return Err(X402Error::InvalidConfig("payTo must be set when x402 is enabled".into()));
        }
        if self.network.trim().is_empty() || self.asset.trim().is_empty() {
            return Err(X402Error::InvalidConfig("network and asset must be set".into()));
        }
        let prices = std::iter::once(("default", self.default_price.as_str())).chain(
            self.routes
                .iter()
                .filter_map(|(m, r)| r.price.as_deref().map(|p| (m.as_str(), p))),
        );
        for (route, price) in prices {
            if price.trim().parse::<u64>().is_err() {
                return Err(X402Error::InvalidConfig(format!(
                    "price '{price}' for {route} is not an integer"
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// A 402 answer ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentChallenge {
    pub status: StatusCode,
    /// Value for the `PAYMENT-REQUIRED` header.
    pub header: String,
    pub body: PaymentRequired,
}

impl PaymentChallenge {
    /// Header pair for the response.
    pub fn header_pair(&self) -> X402Result<(HeaderName, HeaderValue)> {
        let value = HeaderValue::from_str(&self.header)
            .map_err(|e| X402Error::malformed(format!("invalid header value: {e}")))?;
        Ok((header_name(HEADER_PAYMENT_REQUIRED), value))
    }
}

/// A payment that passed verification.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedPayment {
    pub verify: VerifyResponse,
    pub payload: PaymentPayload,
    pub requirements: PaymentRequirements,
}

/// Result of [`Paywall::process_request`].
#[derive(Debug, Clone, PartialEq)]
pub enum PaywallOutcome {
    /// Serve the call without payment.
    NoPaymentNeeded,
    /// Answer with 402.
    PaymentRequired(PaymentChallenge),
    /// Serve the call, then settle.
    PaymentValid(VerifiedPayment),
}

/// Result of [`Paywall::settle_after_response`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettleOutcome {
    pub success: bool,
    pub settle_response: Option<SettleResponse>,
    /// Value for the `PAYMENT-RESPONSE` header.
    pub response_header: Option<String>,
}

impl SettleOutcome {
    fn failed() -> Self {
        Self {
            success: false,
            settle_response: None,
            response_header: None,
        }
    }
}

/// Verifies payments in-process instead of calling the facilitator.
///
/// Any `Fn(&PaymentPayload, &PaymentRequirements) -> VerifyResponse` closure
/// qualifies.
pub trait LocalVerifier: Send + Sync {
    fn verify(&self, payload: &PaymentPayload, requirements: &PaymentRequirements) -> VerifyResponse;
}

impl<F> LocalVerifier for F
where
    F: Fn(&PaymentPayload, &PaymentRequirements) -> VerifyResponse + Send + Sync,
{
    fn verify(&self, payload: &PaymentPayload, requirements: &PaymentRequirements) -> VerifyResponse {
        self(payload, requirements)
    }
}

// =============================================================================
// Paywall
// =============================================================================

#[derive(Default)]
struct SupportedCache {
    supported: Option<SupportedResponse>,
    /// Last successful refresh.
    fetched_at: Option<Instant>,
    /// No refresh is attempted before this after a failed one.
    retry_at: Option<Instant>,
    refreshing: bool,
}

impl SupportedCache {
    fn fee_payer(&self, scheme: &str, network: &str) -> Option<String> {
        self.supported.as_ref()?.fee_payer(scheme, network)
    }
}

/// Clears the in-flight flag even if the refreshing request is dropped.
struct RefreshGuard<'a>(&'a Mutex<SupportedCache>);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .refreshing = false;
    }
}

/// Seller-side x402 payment gate.
pub struct Paywall {
    config: PaywallConfig,
    facilitator: Arc<dyn Facilitator>,
    local_verifier: Option<Arc<dyn LocalVerifier>>,
    events: EventBus,
    supported: Mutex<SupportedCache>,
    supported_ttl: Duration,
    supported_retry: Duration,
}

impl Paywall {
    pub fn new(config: PaywallConfig, facilitator: Arc<dyn Facilitator>) -> Self {
        Self {
            config,
            facilitator,
            local_verifier: None,
            events: EventBus::new(),
            supported: Mutex::new(SupportedCache::default()),
            supported_ttl: Duration::from_secs(SUPPORTED_CACHE_TTL_SECS),
            supported_retry: Duration::from_secs(SUPPORTED_RETRY_BACKOFF_SECS),
        }
    }

    /// Verify payments with `verifier` instead of the facilitator.
    pub fn with_local_verifier(mut self, verifier: Arc<dyn LocalVerifier>) -> Self {
        self.local_verifier = Some(verifier);
        self
    }

    /// Publish `x402:payment-required` events on `events`.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn with_supported_ttl(mut self, ttl: Duration) -> Self {
        self.supported_ttl = ttl;
        self
    }

    /// How long to wait after a failed `/supported` refresh.
    pub fn with_supported_retry(mut self, backoff: Duration) -> Self {
        self.supported_retry = backoff;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &PaywallConfig {
        &self.config
    }

    /// Resource descriptor for a method.
    pub fn resource_for(&self, method: &str) -> ResourceInfo {
        let description = self
            .config
            .routes
            .get(method)
            .and_then(|r| r.description.clone())
            .unwrap_or_else(|| format!("Paid RPC call: {method}"));
        ResourceInfo {
            url: format!("{}{}", self.config.resource_prefix, method),
            description,
            mime_type: Some(self.config.mime_type.clone()),
        }
    }

    /// Requirements offered for a method, with `feePayer` filled in when the
    /// facilitator advertises one.
    pub async fn requirements_for(&self, method: &str) -> PaymentRequirements {
        let route = self.config.routes.get(method);
        let pick = |o: Option<&String>, d: &String| o.unwrap_or(d).clone();

        let mut requirements = PaymentRequirements {
            scheme: SCHEME_EXACT.to_string(),
            network: pick(route.and_then(|r| r.network.as_ref()), &self.config.network),
            asset: pick(route.and_then(|r| r.asset.as_ref()), &self.config.asset),
            amount: pick(route.and_then(|r| r.price.as_ref()), &self.config.default_price),
            pay_to: pick(route.and_then(|r| r.pay_to.as_ref()), &self.config.pay_to),
            max_timeout_seconds: route
                .and_then(|r| r.max_timeout_seconds)
                .unwrap_or(self.config.max_timeout_seconds),
            extra: None,
        };

        if let Some(fee_payer) = self
            .fee_payer(&requirements.scheme, &requirements.network)
            .await
        {
            requirements.extra = Some(json!({ "feePayer": fee_payer }));
        }
        requirements
    }

    /// Decide whether a request may proceed.
    pub async fn process_request(&self, method: &str, headers: &HeaderMap) -> PaywallOutcome {
        if !self.config.enabled {
            return PaywallOutcome::NoPaymentNeeded;
        }

        let requirements = self.requirements_for(method).await;
        if matches!(requirements.amount_units(), Ok(0)) {
            return PaywallOutcome::NoPaymentNeeded;
        }

        let Some(header) = headers.get(HEADER_PAYMENT_SIGNATURE) else {
            debug!(method, "No payment header, issuing challenge");
            return self.challenge(method, requirements, None);
        };

        let payload: PaymentPayload = match header
            .to_str()
            .map_err(|e| X402Error::malformed(e.to_string()))
            .and_then(decode_header)
        {
            Ok(payload) => payload,
            Err(e) => return self.challenge(method, requirements, Some(e.to_string())),
        };

        if payload.x402_version != X402_VERSION {
            let reason = format!("unsupported x402 version {}", payload.x402_version);
            return self.challenge(method, requirements, Some(reason));
        }
        if !payload.accepted.matches(&requirements) {
            let reason = "accepted requirements do not match any offered option".to_string();
            return self.challenge(method, requirements, Some(reason));
        }

        let verified = match &self.local_verifier {
            Some(local) => {
                let verify = local.verify(&payload, &requirements);
                if verify.is_valid {
                    Ok(verify)
                } else {
                    Err(X402Error::Verify {
                        reason: verify
                            .invalid_reason
                            .unwrap_or_else(|| "payment invalid".to_string()),
                        body: None,
                    })
                }
            }
            None => self.facilitator.verify(&payload, &requirements).await,
        };

        match verified {
            Ok(verify) => {
                info!(method, payer = ?verify.payer, amount = %requirements.amount, "Payment verified");
                PaywallOutcome::PaymentValid(VerifiedPayment {
                    verify,
                    payload,
                    requirements,
                })
            }
            Err(e) => {
                if !matches!(e, X402Error::Verify { .. }) {
                    warn!(method, error = %e, "Facilitator unavailable during verification");
                }
                let reason = match e {
                    X402Error::Verify { reason, .. } => reason,
                    other => other.to_string(),
                };
                self.challenge(method, requirements, Some(reason))
            }
        }
    }

    /// Settle a verified payment once the call has been served.
    ///
    /// Never fails: any problem yields `success: false` with no response or
    /// header, and the served response stands.
    pub async fn settle_after_response(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> SettleOutcome {
        let settle = match self.facilitator.settle(payload, requirements).await {
            Ok(settle) => settle,
            Err(e) => {
                warn!(
                    network = %requirements.network,
                    amount = %requirements.amount,
                    error = %e,
                    "Settlement failed; response already served"
                );
                return SettleOutcome::failed();
            }
        };

        match encode_header(&SettlementSummary::from(&settle)) {
            Ok(header) => SettleOutcome {
                success: settle.success,
                settle_response: Some(settle),
                response_header: Some(header),
            },
            Err(e) => {
                warn!(error = %e, "Failed to encode settlement header");
                SettleOutcome::failed()
            }
        }
    }

    fn challenge(
        &self,
        method: &str,
        requirements: PaymentRequirements,
        error: Option<String>,
    ) -> PaywallOutcome {
        let resource = self.resource_for(method);
        let body = PaymentRequired {
            x402_version: X402_VERSION,
            error: error.clone(),
            resource: resource.clone(),
            accepts: vec![requirements],
        };

        self.events.emit(GatewayEvent::PaymentRequired {
            method: method.to_string(),
            resource: resource.url,
            reason: error,
        });

        // Serializing these plain structs cannot fail; fall back to an empty
        // header rather than dropping the challenge.
        let header = encode_header(&body).unwrap_or_default();
        PaywallOutcome::PaymentRequired(PaymentChallenge {
            status: StatusCode::PAYMENT_REQUIRED,
            header,
            body,
        })
    }

    fn lock_supported(&self) -> MutexGuard<'_, SupportedCache> {
        self.supported.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fee payer advertised by the facilitator for `scheme` on `network`.
    ///
    /// At most one request refreshes `/supported` at a time; the others are
    /// served from the current entry without waiting on the facilitator.
    async fn fee_payer(&self, scheme: &str, network: &str) -> Option<String> {
        {
            let mut cache = self.lock_supported();
            let now = Instant::now();
            let fresh = cache
                .fetched_at
                .is_some_and(|t| now.duration_since(t) < self.supported_ttl);
            let backing_off = cache.retry_at.is_some_and(|t| now < t);
            if fresh || backing_off || cache.refreshing {
                return cache.fee_payer(scheme, network);
            }
            cache.refreshing = true;
        }

        let _guard = RefreshGuard(&self.supported);
        let result = self.facilitator.supported().await;

        let mut cache = self.lock_supported();
        match result {
            Ok(supported) => {
                cache.supported = Some(supported);
                cache.fetched_at = Some(Instant::now());
                cache.retry_at = None;
            }
            Err(e) => {
                warn!(error = %e, "Could not refresh facilitator supported kinds");
                // Keep serving the stale entry, if any
                cache.retry_at = Some(Instant::now() + self.supported_retry);
            }
        }
        cache.refreshing = false;
        cache.fee_payer(scheme, network)
    }
}

impl std::fmt::Debug for Paywall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paywall")
            .field("enabled", &self.config.enabled)
            .field("network", &self.config.network)
            .field("local_verifier", &self.local_verifier.is_some())
            .finish_non_exhaustive()
    }
}

/// Lowercase header name for an x402 header constant.
pub fn header_name(name: &str) -> HeaderName {
    match HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes()) {
        Ok(name) => name,
        Err(_) => HeaderName::from_static("x-invalid-header"),
    }
}

/// `PAYMENT-RESPONSE` header pair for a settlement outcome.
pub fn payment_response_header(outcome: &SettleOutcome) -> Option<(HeaderName, HeaderValue)> {
    let value = HeaderValue::from_str(outcome.response_header.as_deref()?).ok()?;
    Some((header_name(HEADER_PAYMENT_RESPONSE), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Facilitator that counts /supported calls and accepts everything.
    #[derive(Default)]
    struct CountingFacilitator {
        supported_calls: AtomicUsize,
        fail_settle: bool,
    }

    #[async_trait]
    impl Facilitator for CountingFacilitator {
        async fn supported(&self) -> X402Result<SupportedResponse> {
            self.supported_calls.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::from_value(json!({
                "kinds": [{"scheme": "exact", "network": "solana:devnet", "extra": {"feePayer": "FeePayer111"}}]
            }))
            .unwrap())
        }

        async fn verify(
            &self,
            _payload: &PaymentPayload,
            _requirements: &PaymentRequirements,
        ) -> X402Result<VerifyResponse> {
            Ok(VerifyResponse::valid("buyer"))
        }

        async fn settle(
            &self,
            _payload: &PaymentPayload,
            requirements: &PaymentRequirements,
        ) -> X402Result<SettleResponse> {
            if self.fail_settle {
                return Err(X402Error::Facilitator("connection refused".into()));
            }
            Ok(SettleResponse {
                success: true,
                transaction: Some("tx-1".into()),
                network: Some(requirements.network.clone()),
                payer: Some("buyer".into()),
                error_reason: None,
            })
        }
    }

    /// Facilitator whose /supported is slow and always fails.
    #[derive(Default)]
    struct SlowFailingFacilitator {
        supported_calls: AtomicUsize,
    }

    #[async_trait]
    impl Facilitator for SlowFailingFacilitator {
        async fn supported(&self) -> X402Result<SupportedResponse> {
            self.supported_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(200)).await;
            Err(X402Error::Facilitator("connection refused".into()))
        }

        async fn verify(
            &self,
            _payload: &PaymentPayload,
            _requirements: &PaymentRequirements,
        ) -> X402Result<VerifyResponse> {
            Ok(VerifyResponse::valid("buyer"))
        }

        async fn settle(
            &self,
            _payload: &PaymentPayload,
            _requirements: &PaymentRequirements,
        ) -> X402Result<SettleResponse> {
            Err(X402Error::Facilitator("connection refused".into()))
        }
    }

    fn config() -> PaywallConfig {
        PaywallConfig::new("solana:devnet", "USDC", "1000", "SellerWallet")
            .with_route(
                "getBlock",
                RouteOverride {
                    price: Some("5000".into()),
                    description: Some("Full block".into()),
                    ..Default::default()
                },
            )
            .with_route(
                "getHealth",
                RouteOverride {
                    price: Some("0".into()),
                    ..Default::default()
                },
            )
    }

    fn signed_headers(payload: &PaymentPayload) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header_name(HEADER_PAYMENT_SIGNATURE),
            HeaderValue::from_str(&encode_header(payload).unwrap()).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn test_disabled_and_free_routes() {
        let facilitator = Arc::new(CountingFacilitator::default());
        let off = Paywall::new(PaywallConfig::default(), facilitator.clone());
        assert_eq!(
            off.process_request("getSlot", &HeaderMap::new()).await,
            PaywallOutcome::NoPaymentNeeded
        );

        let on = Paywall::new(config(), facilitator);
        assert_eq!(
            on.process_request("getHealth", &HeaderMap::new()).await,
            PaywallOutcome::NoPaymentNeeded
        );
    }

    #[tokio::test]
    async fn test_route_override_and_fee_payer() {
        let facilitator = Arc::new(CountingFacilitator::default());
        let paywall = Paywall::new(config(), facilitator.clone());

        let block = paywall.requirements_for("getBlock").await;
        assert_eq!(block.amount, "5000");
        assert_eq!(block.fee_payer(), Some("FeePayer111"));
        assert_eq!(paywall.resource_for("getBlock").description, "Full block");

        let slot = paywall.requirements_for("getSlot").await;
        assert_eq!(slot.amount, "1000");

        // second lookup served from cache
        assert_eq!(facilitator.supported_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_supported_cache_expires() {
        let facilitator = Arc::new(CountingFacilitator::default());
        let paywall =
            Paywall::new(config(), facilitator.clone()).with_supported_ttl(Duration::from_millis(0));
        paywall.requirements_for("getSlot").await;
        paywall.requirements_for("getSlot").await;
        assert_eq!(facilitator.supported_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failing_supported_refresh_does_not_serialize_requests() {
        let facilitator = Arc::new(SlowFailingFacilitator::default());
        let paywall = Paywall::new(config(), facilitator.clone());

        let started = Instant::now();
        let headers = HeaderMap::new();
        let outcomes = tokio::join!(
            paywall.process_request("getSlot", &headers),
            paywall.process_request("getSlot", &headers),
            paywall.process_request("getSlot", &headers),
            paywall.process_request("getSlot", &headers),
            paywall.process_request("getSlot", &headers),
        );
        assert!(started.elapsed() < Duration::from_millis(400));

        for outcome in [outcomes.0, outcomes.1, outcomes.2, outcomes.3, outcomes.4] {
            match outcome {
                PaywallOutcome::PaymentRequired(challenge) => {
                    assert_eq!(challenge.body.accepts[0].fee_payer(), None);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(facilitator.supported_calls.load(Ordering::SeqCst), 1);

        // Failure backs off instead of retrying on the next request
        let started = Instant::now();
        paywall.process_request("getSlot", &headers).await;
        assert!(started.elapsed() < Duration::from_millis(100));
        assert_eq!(facilitator.supported_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_retried_after_backoff() {
        let facilitator = Arc::new(SlowFailingFacilitator::default());
        let paywall = Paywall::new(config(), facilitator.clone())
            .with_supported_retry(Duration::from_millis(0));
        paywall.requirements_for("getSlot").await;
        paywall.requirements_for("getSlot").await;
        assert_eq!(facilitator.supported_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_price_with_leading_zeros_is_free() {
        let paywall = Paywall::new(
            config().with_route(
                "getVersion",
                RouteOverride {
                    price: Some("00".into()),
                    ..Default::default()
                },
            ),
            Arc::new(CountingFacilitator::default()),
        );
        assert_eq!(
            paywall.process_request("getVersion", &HeaderMap::new()).await,
            PaywallOutcome::NoPaymentNeeded
        );
    }

    #[tokio::test]
    async fn test_mismatched_accepted_is_rechallenged() {
        let paywall = Paywall::new(config(), Arc::new(CountingFacilitator::default()));
        let mut accepted = paywall.requirements_for("getSlot").await;
        accepted.amount = "1".into();
        let payload = PaymentPayload {
            x402_version: X402_VERSION,
            accepted,
            resource: None,
            payload: json!({}),
        };

        match paywall.process_request("getSlot", &signed_headers(&payload)).await {
            PaywallOutcome::PaymentRequired(challenge) => {
                assert_eq!(challenge.status, StatusCode::PAYMENT_REQUIRED);
                assert!(challenge.body.error.unwrap().contains("do not match"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_garbage_header_is_rechallenged() {
        let paywall = Paywall::new(config(), Arc::new(CountingFacilitator::default()));
        let mut headers = HeaderMap::new();
        headers.insert(
            header_name(HEADER_PAYMENT_SIGNATURE),
            HeaderValue::from_static("not-base64!"),
        );
        match paywall.process_request("getSlot", &headers).await {
            PaywallOutcome::PaymentRequired(challenge) => {
                assert!(challenge.body.error.unwrap().contains("malformed"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_settle_failure_is_swallowed() {
        let facilitator = Arc::new(CountingFacilitator {
            fail_settle: true,
            ..Default::default()
        });
        let paywall = Paywall::new(config(), facilitator);
        let requirements = paywall.requirements_for("getSlot").await;
        let payload = PaymentPayload {
            x402_version: X402_VERSION,
            accepted: requirements.clone(),
            resource: None,
            payload: json!({}),
        };
        let outcome = paywall.settle_after_response(&payload, &requirements).await;
        assert_eq!(
            outcome,
            SettleOutcome {
                success: false,
                settle_response: None,
                response_header: None
            }
        );
        assert!(payment_response_header(&outcome).is_none());
    }

    #[test]
    fn test_config_validation() {
        assert!(PaywallConfig::default().validate().is_ok());
        assert!(config().validate().is_ok());
        assert!(PaywallConfig::new("n", "a", "1000", "").validate().is_err());
        assert!(PaywallConfig::new("n", "a", "ten", "p").validate().is_err());
    }

    #[test]
    fn test_header_name_lowercased() {
        assert_eq!(header_name(HEADER_PAYMENT_REQUIRED).as_str(), "payment-required");
    }
}
