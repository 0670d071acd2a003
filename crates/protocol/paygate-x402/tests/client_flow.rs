//! Buyer client paying a paywall end to end.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use http::{HeaderMap, HeaderValue, StatusCode};
use paygate_test_utils::MockFacilitator;
use paygate_x402::{
    header_name, payment_response_header, ExchangeRequest, ExchangeResponse, HttpExchange,
    PaymentRequirements, PaymentSigner, Paywall, PaywallConfig, PaywallOutcome, ResourceInfo,
    RouteOverride, X402Client, X402ClientConfig, X402Error, X402Result,
    HEADER_PAYMENT_REQUIRED,
};
use serde_json::{json, Value};

/// Seller stand-in: answers requests through a real paywall.
struct PaywallExchange {
    paywall: Paywall,
    served: AtomicUsize,
}

impl PaywallExchange {
    fn new(paywall: Paywall) -> Arc<Self> {
        Arc::new(Self {
            paywall,
            served: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl HttpExchange for PaywallExchange {
    async fn send(&self, request: ExchangeRequest) -> X402Result<ExchangeResponse> {
        let method = request.url.rsplit('/').next().unwrap_or_default().to_string();
        let mut headers = HeaderMap::new();

        match self.paywall.process_request(&method, &request.headers).await {
            PaywallOutcome::PaymentRequired(challenge) => {
                let (name, value) = challenge.header_pair()?;
                headers.insert(name, value);
                Ok(ExchangeResponse {
                    status: challenge.status,
                    headers,
                    body: serde_json::to_vec(&challenge.body).unwrap_or_default(),
                })
            }
            PaywallOutcome::PaymentValid(payment) => {
                self.served.fetch_add(1, Ordering::SeqCst);
                let settled = self
                    .paywall
                    .settle_after_response(&payment.payload, &payment.requirements)
                    .await;
                if let Some((name, value)) = payment_response_header(&settled) {
                    headers.insert(name, value);
                }
                Ok(ExchangeResponse {
                    status: StatusCode::OK,
                    headers,
                    body: json!({ "result": method }).to_string().into_bytes(),
                })
            }
            PaywallOutcome::NoPaymentNeeded => {
                self.served.fetch_add(1, Ordering::SeqCst);
                Ok(ExchangeResponse {
                    status: StatusCode::OK,
                    headers,
                    body: b"{}".to_vec(),
                })
            }
        }
    }
}

struct FixedSigner;

#[async_trait]
impl PaymentSigner for FixedSigner {
    async fn sign(
        &self,
        requirements: &PaymentRequirements,
        resource: &ResourceInfo,
    ) -> X402Result<Value> {
        Ok(json!({
            "signature": "0xfeed",
            "amount": requirements.amount,
            "resource": resource.url,
        }))
    }
}

fn seller(facilitator: &MockFacilitator) -> Arc<PaywallExchange> {
    let config = PaywallConfig::new("eip155:84532", "USDC", "1000", "0xSeller").with_route(
        "getProgramAccounts",
        RouteOverride {
            price: Some("25000".to_string()),
            ..Default::default()
        },
    );
    PaywallExchange::new(Paywall::new(config, Arc::new(facilitator.clone())))
}

#[tokio::test]
async fn test_client_pays_and_records() {
    let facilitator = MockFacilitator::new();
    let exchange = seller(&facilitator);
    let client = X402Client::new(exchange.clone(), Arc::new(FixedSigner), X402ClientConfig::default());

    let response = client
        .fetch(ExchangeRequest::post("rpc://seller/getSlot", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json::<Value>().unwrap()["result"], "getSlot");
    assert_eq!(exchange.served.load(Ordering::SeqCst), 1);

    let payments = client.payments();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].amount, 1000);
    assert_eq!(payments[0].pay_to, "0xSeller");
    let settlement = payments[0].settlement.clone().unwrap();
    assert_eq!(settlement.transaction.as_deref(), Some("mock-tx-1"));
    assert_eq!(client.total_spent(), 1000);
}

#[tokio::test]
async fn test_client_respects_total_budget() {
    let facilitator = MockFacilitator::new();
    let exchange = seller(&facilitator);
    let client = X402Client::new(
        exchange.clone(),
        Arc::new(FixedSigner),
        X402ClientConfig::default().with_max_total_budget(1500),
    );

    client
        .fetch(ExchangeRequest::get("rpc://seller/getSlot"))
        .await
        .unwrap();
    let err = client
        .fetch(ExchangeRequest::get("rpc://seller/getSlot"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        X402Error::BudgetExceeded {
            amount: 1000,
            spent: 1000
        }
    );
    assert_eq!(exchange.served.load(Ordering::SeqCst), 1);
    assert_eq!(facilitator.verify_calls(), 1);
}

#[tokio::test]
async fn test_budget_callback_refuses() {
    let facilitator = MockFacilitator::new();
    let client = X402Client::new(
        seller(&facilitator),
        Arc::new(FixedSigner),
        X402ClientConfig::default(),
    )
    .with_budget_check(Arc::new(|amount: u64, _spent: u64| amount <= 10_000));

    client
        .fetch(ExchangeRequest::get("rpc://seller/getSlot"))
        .await
        .unwrap();
    let err = client
        .fetch(ExchangeRequest::get("rpc://seller/getProgramAccounts"))
        .await
        .unwrap_err();
    assert!(matches!(err, X402Error::BudgetExceeded { amount: 25_000, .. }));
    assert_eq!(client.payments().len(), 1);
}

#[tokio::test]
async fn test_per_call_cap_leaves_no_option() {
    let facilitator = MockFacilitator::new();
    let client = X402Client::new(
        seller(&facilitator),
        Arc::new(FixedSigner),
        X402ClientConfig::default().with_max_amount_per_call(5_000),
    );

    let err = client
        .fetch(ExchangeRequest::get("rpc://seller/getProgramAccounts"))
        .await
        .unwrap_err();
    assert_eq!(err, X402Error::NoAcceptablePayment { offered: 1 });
    assert!(client.payments().is_empty());
}

#[tokio::test]
async fn test_rejected_payments_exhaust_retries() {
    let facilitator = MockFacilitator::new().with_rejection("invalid_signature");
    let exchange = seller(&facilitator);
    let client = X402Client::new(
        exchange.clone(),
        Arc::new(FixedSigner),
        X402ClientConfig::default().with_max_attempts(2),
    );

    let err = client
        .fetch(ExchangeRequest::get("rpc://seller/getSlot"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        X402Error::RetriesExhausted {
            attempts: 2,
            last_error: Some("invalid_signature".to_string())
        }
    );
    assert_eq!(facilitator.verify_calls(), 2);
    assert_eq!(exchange.served.load(Ordering::SeqCst), 0);
    assert!(client.payments().is_empty());
}

#[tokio::test]
async fn test_malformed_challenge_is_reported() {
    struct Broken;

    #[async_trait]
    impl HttpExchange for Broken {
        async fn send(&self, _request: ExchangeRequest) -> X402Result<ExchangeResponse> {
            let mut headers = HeaderMap::new();
            headers.insert(
                header_name(HEADER_PAYMENT_REQUIRED),
                HeaderValue::from_static("not-base64!"),
            );
            Ok(ExchangeResponse {
                status: StatusCode::PAYMENT_REQUIRED,
                headers,
                body: Vec::new(),
            })
        }
    }

    let client = X402Client::new(Arc::new(Broken), Arc::new(FixedSigner), X402ClientConfig::default());
    let err = client
        .fetch(ExchangeRequest::get("rpc://seller/getSlot"))
        .await
        .unwrap_err();
    assert!(matches!(err, X402Error::MalformedPayload { .. }));
}

#[tokio::test]
async fn test_preferred_network_not_offered() {
    let facilitator = MockFacilitator::new();
    let exchange = seller(&facilitator);
    let client = X402Client::new(
        exchange.clone(),
        Arc::new(FixedSigner),
        X402ClientConfig::default().with_preferred_network("solana:EtWTRABZaYq6iMfeYKouRu166VU2xqa1"),
    );

    let err = client
        .fetch(ExchangeRequest::get("rpc://seller/getSlot"))
        .await
        .unwrap_err();
    assert_eq!(err, X402Error::NoAcceptablePayment { offered: 1 });
    assert_eq!(facilitator.verify_calls(), 0);
    assert_eq!(exchange.served.load(Ordering::SeqCst), 0);
}
