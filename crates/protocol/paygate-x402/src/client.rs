//! Buyer-side x402 client.
//!
//! Wraps an HTTP exchange so that a 402 answer is paid transparently: pick
//! an offered requirement, check the budget, sign, resend with
//! `PAYMENT-SIGNATURE`. Signing and transport are injected.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use paygate_types::{now_ms, Amount, DEFAULT_MAX_PAYMENT_ATTEMPTS};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{X402Error, X402Result};
use crate::paywall::header_name;
use crate::types::{
    decode_header, encode_header, PaymentPayload, PaymentRequired, PaymentRequirements,
    ResourceInfo, SettlementSummary, HEADER_PAYMENT_REQUIRED, HEADER_PAYMENT_RESPONSE,
    HEADER_PAYMENT_SIGNATURE, X402_VERSION,
};

// =============================================================================
// Transport
// =============================================================================

/// An outgoing HTTP request.
#[derive(Debug, Clone)]
pub struct ExchangeRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl ExchangeRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: HeaderMap::new(),
            body: Some(body),
        }
    }
}

/// A received HTTP response.
#[derive(Debug, Clone)]
pub struct ExchangeResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ExchangeResponse {
    pub fn json<T: DeserializeOwned>(&self) -> X402Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| X402Error::Transport(format!("invalid JSON body: {e}")))
    }

    /// Decoded `PAYMENT-RESPONSE` header, if present and well-formed.
    pub fn settlement(&self) -> Option<SettlementSummary> {
        let raw = self.headers.get(HEADER_PAYMENT_RESPONSE)?.to_str().ok()?;
        decode_header(raw).ok()
    }
}

/// Sends one HTTP request.
#[async_trait]
pub trait HttpExchange: Send + Sync {
    async fn send(&self, request: ExchangeRequest) -> X402Result<ExchangeResponse>;
}

/// [`HttpExchange`] over reqwest.
#[derive(Debug, Clone, Default)]
pub struct ReqwestExchange {
    client: reqwest::Client,
}

impl ReqwestExchange {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpExchange for ReqwestExchange {
    async fn send(&self, request: ExchangeRequest) -> X402Result<ExchangeResponse> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| X402Error::Transport(e.to_string()))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| X402Error::Transport(e.to_string()))?
            .to_vec();

        Ok(ExchangeResponse {
            status,
            headers,
            body,
        })
    }
}

// =============================================================================
// Signing and policy
// =============================================================================

/// Produces the scheme-specific signed authorization for a requirement.
#[async_trait]
pub trait PaymentSigner: Send + Sync {
    async fn sign(
        &self,
        requirements: &PaymentRequirements,
        resource: &ResourceInfo,
    ) -> X402Result<Value>;
}

/// Picks one requirement from those offered, or none.
pub type RequirementSelector =
    Arc<dyn Fn(&[PaymentRequirements], &X402ClientConfig) -> Option<PaymentRequirements> + Send + Sync>;

/// Decides whether `amount` may be paid given what was already spent.
pub type BudgetCheck = Arc<dyn Fn(Amount, Amount) -> bool + Send + Sync>;

/// Buyer-side limits and preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct X402ClientConfig {
    pub preferred_network: Option<String>,
    pub preferred_asset: Option<String>,
    /// Largest single payment allowed.
    pub max_amount_per_call: Option<Amount>,
    /// Lifetime spend cap for this client.
    pub max_total_budget: Option<Amount>,
    /// Paid attempts per request before giving up.
    pub max_attempts: u32,
}

impl Default for X402ClientConfig {
    fn default() -> Self {
        Self {
            preferred_network: None,
            preferred_asset: None,
            max_amount_per_call: None,
            max_total_budget: None,
            max_attempts: DEFAULT_MAX_PAYMENT_ATTEMPTS,
        }
    }
}

impl X402ClientConfig {
    pub fn with_preferred_network(mut self, network: impl Into<String>) -> Self {
        self.preferred_network = Some(network.into());
        self
    }

    pub fn with_preferred_asset(mut self, asset: impl Into<String>) -> Self {
        self.preferred_asset = Some(asset.into());
        self
    }

    pub fn with_max_amount_per_call(mut self, amount: Amount) -> Self {
        self.max_amount_per_call = Some(amount);
        self
    }

    pub fn with_max_total_budget(mut self, amount: Amount) -> Self {
        self.max_total_budget = Some(amount);
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }
}

/// Default selector: cheapest parseable option within `max_amount_per_call`
/// on the configured preferred network and asset.
///
/// A preference is a filter: when no offer satisfies it, nothing is selected.
pub fn select_cheapest(
    offered: &[PaymentRequirements],
    config: &X402ClientConfig,
) -> Option<PaymentRequirements> {
    let preferred = |r: &PaymentRequirements| {
        config
            .preferred_network
            .as_ref()
            .map_or(true, |n| &r.network == n)
            && config
                .preferred_asset
                .as_ref()
                .map_or(true, |a| r.asset.eq_ignore_ascii_case(a))
    };

    offered
        .iter()
        .filter(|r| preferred(r))
        .filter_map(|r| r.amount_units().ok().map(|a| (a, r)))
        .filter(|(a, _)| config.max_amount_per_call.map_or(true, |max| *a <= max))
        .min_by_key(|(a, _)| *a)
        .map(|(_, r)| r.clone())
}

/// One payment made by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub url: String,
    pub amount: Amount,
    pub network: String,
    pub asset: String,
    pub pay_to: String,
    /// Settlement reported by the seller, when it sent one.
    pub settlement: Option<SettlementSummary>,
    pub timestamp: u64,
}

// =============================================================================
// Client
// =============================================================================

/// Pays for HTTP resources that answer 402.
pub struct X402Client {
    exchange: Arc<dyn HttpExchange>,
    signer: Arc<dyn PaymentSigner>,
    config: X402ClientConfig,
    selector: RequirementSelector,
    budget_check: Option<BudgetCheck>,
    payments: RwLock<Vec<PaymentRecord>>,
}

impl X402Client {
    pub fn new(
        exchange: Arc<dyn HttpExchange>,
        signer: Arc<dyn PaymentSigner>,
        config: X402ClientConfig,
    ) -> Self {
        Self {
            exchange,
            signer,
            config,
            selector: Arc::new(select_cheapest),
            budget_check: None,
            payments: RwLock::new(Vec::new()),
        }
    }

    /// Replace the requirement selector.
    pub fn with_selector(mut self, selector: RequirementSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Add a budget check consulted before every payment.
    pub fn with_budget_check(mut self, check: BudgetCheck) -> Self {
        self.budget_check = Some(check);
        self
    }

    pub fn config(&self) -> &X402ClientConfig {
        &self.config
    }

    /// Sum of all recorded payments.
    pub fn total_spent(&self) -> Amount {
        self.read_payments()
            .iter()
            .fold(0, |acc: Amount, p| acc.saturating_add(p.amount))
    }

    /// Recorded payments, oldest first.
    pub fn payments(&self) -> Vec<PaymentRecord> {
        self.read_payments().clone()
    }

    /// Send `request`, paying for it if the server answers 402.
    ///
    /// A payment is recorded only when the paid request is answered with
    /// something other than 402.
    pub async fn fetch(&self, request: ExchangeRequest) -> X402Result<ExchangeResponse> {
        let mut response = self.exchange.send(request.clone()).await?;
        let mut attempts = 0u32;

        while response.status == StatusCode::PAYMENT_REQUIRED {
            let challenge = parse_challenge(&response)?;
            if attempts >= self.config.max_attempts {
                return Err(X402Error::RetriesExhausted {
                    attempts,
                    last_error: challenge.error,
                });
            }
            attempts += 1;

            let requirements = (self.selector)(&challenge.accepts, &self.config).ok_or(
                X402Error::NoAcceptablePayment {
                    offered: challenge.accepts.len(),
                },
            )?;
            let amount = requirements.amount_units()?;
            self.check_budget(amount)?;

            let authorization = self
                .signer
                .sign(&requirements, &challenge.resource)
                .await?;
            let payload = PaymentPayload {
                x402_version: X402_VERSION,
                accepted: requirements.clone(),
                resource: Some(challenge.resource.clone()),
                payload: authorization,
            };
            let header = HeaderValue::from_str(&encode_header(&payload)?)
                .map_err(|e| X402Error::Signing(format!("unencodable payment header: {e}")))?;

            let mut paid = request.clone();
            paid.headers.insert(header_name(HEADER_PAYMENT_SIGNATURE), header);
            debug!(url = %request.url, amount, attempt = attempts, "Retrying with payment");
            response = self.exchange.send(paid).await?;

            if response.status != StatusCode::PAYMENT_REQUIRED {
                let record = PaymentRecord {
                    url: request.url.clone(),
                    amount,
                    network: requirements.network,
                    asset: requirements.asset,
                    pay_to: requirements.pay_to,
                    settlement: response.settlement(),
                    timestamp: now_ms(),
                };
                info!(url = %record.url, amount, "Payment accepted");
                self.payments
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(record);
            }
        }

        Ok(response)
    }

    fn check_budget(&self, amount: Amount) -> X402Result<()> {
        let spent = self.total_spent();
        let over_cap = self
            .config
            .max_total_budget
            .is_some_and(|cap| spent.saturating_add(amount) > cap);
        let refused = self
            .budget_check
            .as_ref()
            .is_some_and(|check| !check(amount, spent));
        if over_cap || refused {
            warn!(amount, spent, "Payment refused by budget");
            return Err(X402Error::BudgetExceeded { amount, spent });
        }
        Ok(())
    }

    fn read_payments(&self) -> std::sync::RwLockReadGuard<'_, Vec<PaymentRecord>> {
        self.payments.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for X402Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("X402Client")
            .field("config", &self.config)
            .field("payments", &self.read_payments().len())
            .finish_non_exhaustive()
    }
}

/// Challenge from the `PAYMENT-REQUIRED` header, falling back to the body.
fn parse_challenge(response: &ExchangeResponse) -> X402Result<PaymentRequired> {
    if let Some(raw) = response.headers.get(HEADER_PAYMENT_REQUIRED) {
        let raw = raw
            .to_str()
            .map_err(|e| X402Error::malformed(format!("non-ASCII challenge header: {e}")))?;
        return decode_header(raw);
    }
    response
        .json::<PaymentRequired>()
        .map_err(|_| X402Error::malformed("402 without a payment challenge"))
}
