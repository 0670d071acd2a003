//! The gateway orchestrator.
//!
//! Composes pricing, sessions, attestation, the x402 paywall and the
//! marketplace into one call-serving pipeline:
//!
//! ```text
//! open_session(intent) ─→ AgentSession (active)
//!
//! call(session, method, params)
//!   ├─ lock session (pre/post are serialised per session)
//!   ├─ pre_call        ── fails fast, nothing charged
//!   ├─ transport.request
//!   ├─ post_call       ── charge
//!   ├─ report latency  ── feeds congestion pricing
//!   └─ attest          ── when the tier includes attestation
//!
//! handle_x402(method, params, headers)
//!   ├─ paywall         ── 402 / valid / free
//!   ├─ transport.request
//!   └─ settle          ── failure reported, never unwinds
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Instant;

use http::{HeaderMap, StatusCode};
use paygate_crypto::{AttestationSigner, SignatureVerifier};
use paygate_econ::PricingEngine;
use paygate_market::{MarketError, SearchQuery, ToolListing, ToolMarketplace};
use paygate_session::{AgentSession, SessionState, UsageSummary};
use paygate_types::{
    AgentIdentity, Amount, EventBus, EventKind, GatewayEvent, PaymentIntent, PricingTier,
    SharedClock, SubscriptionId, SystemClock,
};
use paygate_valid::{ResponseAttestation, ResponseValidator};
use paygate_x402::{
    payment_response_header, Facilitator, FacilitatorClient, LocalVerifier, Paywall,
    PaywallOutcome, SettleOutcome,
};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::transport::RpcTransport;

/// Result of a metered call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    pub result: Value,
    /// Amount charged to the session.
    pub cost: Amount,
    pub budget_remaining: Amount,
    pub latency_ms: u64,
    pub attestation: Option<ResponseAttestation>,
}

/// HTTP-shaped answer to an x402 request.
#[derive(Debug, Clone)]
pub struct X402Response {
    /// 200 when served, 402 when payment is required.
    pub status: StatusCode,
    /// `PAYMENT-REQUIRED` or `PAYMENT-RESPONSE` when applicable.
    pub headers: HeaderMap,
    /// RPC result, or the payment challenge on 402.
    pub body: Value,
    /// Present when a verified payment was settled (or failed to).
    pub settlement: Option<SettleOutcome>,
}

/// Per-method transport success counts, for listing uptime.
#[derive(Debug, Default, Clone, Copy)]
struct CallStats {
    ok: u64,
    total: u64,
}

impl CallStats {
    fn uptime_percent(self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.ok as f64 * 100.0 / self.total as f64
    }
}

/// The agent commerce gateway.
pub struct Gateway {
    config: GatewayConfig,
    seller: AgentIdentity,
    transport: Arc<dyn RpcTransport>,
    pricing: Arc<PricingEngine>,
    validator: Option<ResponseValidator>,
    paywall: Option<Paywall>,
    intent_verifier: Option<Arc<dyn SignatureVerifier>>,
    market: RwLock<ToolMarketplace>,
    sessions: RwLock<HashMap<String, Arc<Mutex<AgentSession>>>>,
    seen_nonces: StdMutex<HashSet<String>>,
    call_stats: StdMutex<HashMap<String, CallStats>>,
    events: EventBus,
    clock: SharedClock,
}

impl Gateway {
    /// Build a gateway from a validated config.
    pub fn new(
        config: GatewayConfig,
        transport: Arc<dyn RpcTransport>,
        facilitator: Arc<dyn Facilitator>,
    ) -> GatewayResult<Self> {
        config.validate()?;

        let pricing = PricingEngine::with_tiers(config.pricing.clone(), config.tiers.clone())?;
        for (method, tier_id) in &config.method_tiers {
            let tier = pricing
                .get_tier(tier_id, None)
                .ok_or_else(|| GatewayError::TierNotFound(tier_id.clone()))?;
            pricing.set_method_override(method.clone(), tier)?;
        }

        let clock = SystemClock::shared();
        let events = EventBus::new();
        let validator = config
            .attestation
            .enabled
            .then(|| ResponseValidator::new(config.attestation.validator_config()));
        let paywall = config.x402.paywall.enabled.then(|| {
            Paywall::new(config.x402.paywall.clone(), facilitator).with_events(events.clone())
        });

        info!(
            seller = %config.seller.id,
            tiers = config.tiers.len(),
            methods = config.methods.len(),
            x402 = paywall.is_some(),
            attestation = validator.is_some(),
            "Gateway initialized"
        );

        Ok(Self {
            seller: config.seller.identity(),
            config,
            transport,
            pricing: Arc::new(pricing),
            validator,
            paywall,
            intent_verifier: None,
            market: RwLock::new(ToolMarketplace::new().with_clock(clock.clone())),
            sessions: RwLock::new(HashMap::new()),
            seen_nonces: StdMutex::new(HashSet::new()),
            call_stats: StdMutex::new(HashMap::new()),
            events,
            clock,
        })
    }

    /// Build a gateway talking to the facilitator named in the config.
    pub fn from_config(config: GatewayConfig, transport: Arc<dyn RpcTransport>) -> GatewayResult<Self> {
        let facilitator = FacilitatorClient::from_config(&config.x402.facilitator_config()?)?;
        Self::new(config, transport, Arc::new(facilitator))
    }

    /// Sign attestations with `signer`.
    pub fn with_signer(mut self, signer: Arc<dyn AttestationSigner>) -> Self {
        self.validator = self.validator.map(|v| v.with_signer(signer));
        self
    }

    /// Check intent signatures before opening sessions. The buyer's wallet
    /// address is used as the public key.
    pub fn with_intent_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.intent_verifier = Some(verifier);
        self
    }

    /// Verify x402 payments in-process instead of via the facilitator.
    pub fn with_local_verifier(mut self, verifier: Arc<dyn LocalVerifier>) -> Self {
        self.paywall = self.paywall.map(|p| p.with_local_verifier(verifier));
        self
    }

    /// Read time from `clock`. Call before opening sessions or listing tools.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.validator = self.validator.map(|v| v.with_clock(clock.clone()));
        self.market = RwLock::new(ToolMarketplace::new().with_clock(clock.clone()));
        self.clock = clock;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn seller(&self) -> &AgentIdentity {
        &self.seller
    }

    pub fn pricing(&self) -> &PricingEngine {
        &self.pricing
    }

    pub fn validator(&self) -> Option<&ResponseValidator> {
        self.validator.as_ref()
    }

    pub fn paywall(&self) -> Option<&Paywall> {
        self.paywall.as_ref()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Register an event handler on the shared bus.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&GatewayEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(kind, handler)
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Validate an intent and open an active session for it.
    pub async fn open_session(&self, intent: &PaymentIntent) -> GatewayResult<String> {
        let tier = self
            .pricing
            .get_tier(&intent.tier_id, None)
            .ok_or_else(|| GatewayError::TierNotFound(intent.tier_id.clone()))?;
        self.check_intent(intent)?;
        self.claim_nonce(&intent.nonce)?;

        let mut session =
            AgentSession::with_clock(intent, tier, self.config.session.clone(), self.clock.clone())
                .with_pricing(self.pricing.clone())
                .with_events(self.events.clone());
        session.activate()?;

        let id = session.id().to_string();
        info!(
            session_id = %id,
            buyer = %intent.buyer.id,
            tier = %intent.tier_id,
            budget = intent.max_budget,
            "Session opened"
        );
        self.sessions
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(session)));
        Ok(id)
    }

    fn check_intent(&self, intent: &PaymentIntent) -> GatewayResult<()> {
        let reject = |reason: String| Err(GatewayError::IntentRejected { reason });

        if intent.seller.id != self.seller.id {
            return reject(format!(
                "intent is for seller '{}', this gateway is '{}'",
                intent.seller.id, self.seller.id
            ));
        }
        if intent.max_budget == 0 {
            return reject("max budget must be positive".into());
        }
        if intent.is_expired(self.clock.now_ms()) {
            return Err(GatewayError::IntentExpired {
                nonce: intent.nonce.clone(),
            });
        }
        if let Some(verifier) = &self.intent_verifier {
            let valid = verifier.verify(
                intent.signing_message().as_bytes(),
                &intent.signature,
                &intent.buyer.wallet_address,
            );
            if !valid {
                return reject("signature does not verify".into());
            }
        }
        Ok(())
    }

    fn claim_nonce(&self, nonce: &str) -> GatewayResult<()> {
        let mut seen = self
            .seen_nonces
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !seen.insert(nonce.to_string()) {
            return Err(GatewayError::NonceReused(nonce.to_string()));
        }
        Ok(())
    }

    async fn session(&self, session_id: &str) -> GatewayResult<Arc<Mutex<AgentSession>>> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| GatewayError::SessionNotFound(session_id.to_string()))
    }

    pub async fn pause_session(&self, session_id: &str) -> GatewayResult<()> {
        self.session(session_id).await?.lock().await.pause();
        Ok(())
    }

    pub async fn resume_session(&self, session_id: &str) -> GatewayResult<()> {
        self.session(session_id).await?.lock().await.resume();
        Ok(())
    }

    /// Finalize a session. Idempotent.
    pub async fn settle_session(&self, session_id: &str) -> GatewayResult<UsageSummary> {
        let summary = self.session(session_id).await?.lock().await.settle();
        info!(
            session_id,
            amount_charged = summary.amount_charged,
            calls = summary.call_count,
            "Session settled"
        );
        Ok(summary)
    }

    pub async fn snapshot(&self, session_id: &str) -> GatewayResult<SessionState> {
        Ok(self.session(session_id).await?.lock().await.snapshot())
    }

    /// Ids of all tracked sessions, sorted.
    pub async fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Drop sessions in a terminal state. Returns how many were removed.
    pub async fn prune_terminal_sessions(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let mut terminal = Vec::new();
        for (id, session) in sessions.iter() {
            if session.lock().await.is_terminal() {
                terminal.push(id.clone());
            }
        }
        for id in &terminal {
            sessions.remove(id);
        }
        if !terminal.is_empty() {
            debug!(pruned = terminal.len(), "Pruned terminal sessions");
        }
        terminal.len()
    }

    // =========================================================================
    // Calls
    // =========================================================================

    /// Serve one metered call on a session.
    ///
    /// The session stays locked for the whole call so concurrent callers on
    /// the same session cannot race past budget or rate checks. A transport
    /// failure charges nothing.
    pub async fn call(&self, session_id: &str, method: &str, params: Value) -> GatewayResult<CallOutcome> {
        let session = self.session(session_id).await?;
        let mut session = session.lock().await;

        let cost = session.pre_call(method)?;
        debug!(session_id, method, cost, "Pre-flight passed");

        let started = Instant::now();
        let outcome = self.transport.request(method, &params).await;
        let latency_ms = elapsed_ms(started);
        self.record_call(method, outcome.is_ok()).await;

        let result = outcome.map_err(|source| {
            warn!(session_id, method, error = %source, "Transport failed; call not charged");
            GatewayError::Transport {
                method: method.to_string(),
                session_id: Some(session_id.to_string()),
                source,
            }
        })?;

        session.post_call(method, cost)?;
        self.pricing.report_latency(latency_ms as f64);

        let attestation = if session.tier().includes_attestation {
            self.attest(session_id, method, &params, &result, latency_ms).await
        } else {
            None
        };

        Ok(CallOutcome {
            result,
            cost,
            budget_remaining: session.budget_remaining(),
            latency_ms,
            attestation,
        })
    }

    async fn attest(
        &self,
        session_id: &str,
        method: &str,
        params: &Value,
        result: &Value,
        latency_ms: u64,
    ) -> Option<ResponseAttestation> {
        let validator = self.validator.as_ref()?;
        let attested = validator
            .attest(session_id, method, params, result, response_slot(result))
            .await;
        let success = attested.is_ok();
        self.market
            .write()
            .await
            .report_attestation(&self.seller.id, success, latency_ms);

        match attested {
            Ok(attestation) => Some(attestation),
            Err(e) => {
                warn!(session_id, method, error = %e, "Attestation failed; response served unattested");
                None
            }
        }
    }

    async fn record_call(&self, method: &str, ok: bool) {
        let stats = {
            let mut all = self.call_stats.lock().unwrap_or_else(PoisonError::into_inner);
            let stats = all.entry(method.to_string()).or_default();
            stats.total += 1;
            if ok {
                stats.ok += 1;
            }
            *stats
        };
        let updated = self
            .market
            .write()
            .await
            .update_uptime(method, &self.seller.id, stats.uptime_percent());
        match updated {
            // Methods are only listed after publish_listings
            Ok(()) | Err(MarketError::ListingNotFound { .. }) => {}
            Err(e) => debug!(method, error = %e, "Uptime update failed"),
        }
    }

    /// Serve a call behind the x402 paywall.
    ///
    /// Without the paywall (or on a free route) the call is served directly.
    /// A missing or rejected payment yields a 402. A verified payment is
    /// settled after the call succeeds; settlement failure is reported in
    /// [`X402Response::settlement`] and does not affect the served body.
    pub async fn handle_x402(&self, method: &str, params: Value, headers: &HeaderMap) -> GatewayResult<X402Response> {
        let outcome = match &self.paywall {
            Some(paywall) => paywall.process_request(method, headers).await,
            None => PaywallOutcome::NoPaymentNeeded,
        };

        match outcome {
            PaywallOutcome::NoPaymentNeeded => {
                let body = self.execute(method, &params).await?;
                Ok(X402Response {
                    status: StatusCode::OK,
                    headers: HeaderMap::new(),
                    body,
                    settlement: None,
                })
            }
            PaywallOutcome::PaymentRequired(challenge) => {
                let mut headers = HeaderMap::new();
                let (name, value) = challenge.header_pair()?;
                headers.insert(name, value);
                let body = serde_json::to_value(&challenge.body).unwrap_or(Value::Null);
                Ok(X402Response {
                    status: challenge.status,
                    headers,
                    body,
                    settlement: None,
                })
            }
            PaywallOutcome::PaymentValid(payment) => {
                let body = self.execute(method, &params).await?;

                let mut headers = HeaderMap::new();
                let settlement = match &self.paywall {
                    Some(paywall) => {
                        paywall
                            .settle_after_response(&payment.payload, &payment.requirements)
                            .await
                    }
                    None => SettleOutcome {
                        success: false,
                        settle_response: None,
                        response_header: None,
                    },
                };
                if let Some((name, value)) = payment_response_header(&settlement) {
                    headers.insert(name, value);
                }
                if !settlement.success {
                    warn!(method, payer = ?payment.verify.payer, "Served x402 call without settlement");
                }
                Ok(X402Response {
                    status: StatusCode::OK,
                    headers,
                    body,
                    settlement: Some(settlement),
                })
            }
        }
    }

    async fn execute(&self, method: &str, params: &Value) -> GatewayResult<Value> {
        let started = Instant::now();
        let outcome = self.transport.request(method, params).await;
        self.record_call(method, outcome.is_ok()).await;
        let result = outcome.map_err(|source| GatewayError::Transport {
            method: method.to_string(),
            session_id: None,
            source,
        })?;
        self.pricing.report_latency(elapsed_ms(started) as f64);
        Ok(result)
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    /// List every configured method under this gateway's seller identity.
    ///
    /// Returns the number of listings written.
    pub async fn publish_listings(&self) -> GatewayResult<usize> {
        let tiers = self.pricing.tiers();
        let attested = self.validator.is_some() && tiers.iter().any(|t| t.includes_attestation);

        let listings: Vec<ToolListing> = self
            .config
            .methods
            .iter()
            .map(|m| {
                let offered: Vec<PricingTier> = match self.config.method_tiers.get(&m.name) {
                    Some(tier_id) => tiers.iter().filter(|t| &t.id == tier_id).cloned().collect(),
                    None => tiers.clone(),
                };
                let mut listing = ToolListing::new(&m.name, self.seller.clone())
                    .with_description(&m.description)
                    .with_tiers(offered)
                    .with_attestation(attested);
                listing.commitments = m.commitments.clone();
                listing.region = self.config.seller.region.clone();
                listing
            })
            .collect();

        let count = self.market.write().await.list_tools(listings)?;
        info!(seller = %self.seller.id, count, "Listings published");
        Ok(count)
    }

    pub async fn search_tools(&self, query: &SearchQuery) -> Vec<ToolListing> {
        self.market.read().await.search(query)
    }

    /// Read access to the marketplace.
    pub async fn marketplace(&self) -> RwLockReadGuard<'_, ToolMarketplace> {
        self.market.read().await
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("seller", &self.seller.id)
            .field("x402", &self.paywall.is_some())
            .field("attestation", &self.validator.is_some())
            .finish_non_exhaustive()
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Slot reported by a Solana-style `{context: {slot}}` result, else 0.
fn response_slot(result: &Value) -> u64 {
    result
        .pointer("/context/slot")
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_slot() {
        assert_eq!(response_slot(&json!({"context": {"slot": 42}, "value": 1})), 42);
        assert_eq!(response_slot(&json!(7)), 0);
    }

    #[test]
    fn test_uptime_percent() {
        assert_eq!(CallStats::default().uptime_percent(), 100.0);
        assert_eq!(CallStats { ok: 3, total: 4 }.uptime_percent(), 75.0);
    }
}
