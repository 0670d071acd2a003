//! Paywall handshake against the mock facilitator.

use std::sync::{Arc, Mutex};

use http::{HeaderMap, HeaderValue, StatusCode};
use paygate_test_utils::MockFacilitator;
use paygate_types::{EventBus, EventKind, GatewayEvent};
use paygate_x402::{
    decode_header, encode_header, header_name, payment_response_header, PaymentPayload,
    PaymentRequirements, Paywall, PaywallConfig, PaywallOutcome, SettlementSummary,
    VerifyResponse, HEADER_PAYMENT_SIGNATURE, X402_VERSION,
};
use serde_json::json;

const NETWORK: &str = "eip155:84532";

fn paywall(facilitator: &MockFacilitator) -> Paywall {
    let config = PaywallConfig::new(NETWORK, "USDC", "1000", "0xSeller");
    Paywall::new(config, Arc::new(facilitator.clone()))
}

fn signed_headers(accepted: &PaymentRequirements) -> HeaderMap {
    let payload = PaymentPayload {
        x402_version: X402_VERSION,
        accepted: accepted.clone(),
        resource: None,
        payload: json!({ "signature": "0xfeed", "authorization": { "from": "0xBuyer" } }),
    };
    let mut headers = HeaderMap::new();
    headers.insert(
        header_name(HEADER_PAYMENT_SIGNATURE),
        HeaderValue::from_str(&encode_header(&payload).unwrap()).unwrap(),
    );
    headers
}

async fn challenge_requirements(paywall: &Paywall, method: &str) -> PaymentRequirements {
    match paywall.process_request(method, &HeaderMap::new()).await {
        PaywallOutcome::PaymentRequired(challenge) => challenge.body.accepts[0].clone(),
        other => panic!("expected 402, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unpaid_request_is_challenged() {
    let facilitator = MockFacilitator::new().with_fee_payer(NETWORK, "FeePayer1111");
    let paywall = paywall(&facilitator);

    let outcome = paywall.process_request("getBalance", &HeaderMap::new()).await;
    let PaywallOutcome::PaymentRequired(challenge) = outcome else {
        panic!("expected a challenge");
    };

    assert_eq!(challenge.status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(challenge.body.accepts.len(), 1);
    assert_eq!(challenge.body.accepts[0].amount, "1000");
    assert_eq!(challenge.body.accepts[0].fee_payer(), Some("FeePayer1111"));
    assert_eq!(challenge.body.resource.url, "rpc://getBalance");
    assert!(challenge.body.error.is_none());

    // Header carries the same body
    let decoded: paygate_x402::PaymentRequired = decode_header(&challenge.header).unwrap();
    assert_eq!(decoded, challenge.body);
}

#[tokio::test]
async fn test_paid_request_verifies_and_settles() {
    let facilitator = MockFacilitator::new();
    let paywall = paywall(&facilitator);
    let accepted = challenge_requirements(&paywall, "getBalance").await;

    let outcome = paywall
        .process_request("getBalance", &signed_headers(&accepted))
        .await;
    let PaywallOutcome::PaymentValid(payment) = outcome else {
        panic!("expected a valid payment");
    };
    assert_eq!(facilitator.verify_calls(), 1);
    assert_eq!(payment.requirements.amount, "1000");

    let settled = paywall
        .settle_after_response(&payment.payload, &payment.requirements)
        .await;
    assert!(settled.success);
    assert_eq!(facilitator.settle_calls(), 1);

    let (name, value) = payment_response_header(&settled).unwrap();
    assert_eq!(name.as_str(), "payment-response");
    let summary: SettlementSummary = decode_header(value.to_str().unwrap()).unwrap();
    assert!(summary.success);
    assert_eq!(summary.transaction.as_deref(), Some("mock-tx-1"));
    assert_eq!(summary.network.as_deref(), Some(NETWORK));
}

#[tokio::test]
async fn test_rejected_payment_is_rechallenged_with_reason() {
    let facilitator = MockFacilitator::new().with_rejection("insufficient_balance");
    let paywall = paywall(&facilitator);
    let accepted = challenge_requirements(&paywall, "getSlot").await;

    let outcome = paywall
        .process_request("getSlot", &signed_headers(&accepted))
        .await;
    let PaywallOutcome::PaymentRequired(challenge) = outcome else {
        panic!("expected a re-challenge");
    };
    assert_eq!(challenge.body.error.as_deref(), Some("insufficient_balance"));
    assert_eq!(facilitator.settle_calls(), 0);
}

#[tokio::test]
async fn test_unreachable_facilitator_never_serves_unpaid() {
    let facilitator = MockFacilitator::new();
    let paywall = paywall(&facilitator);
    let accepted = challenge_requirements(&paywall, "getSlot").await;

    facilitator.set_unreachable(true);
    let outcome = paywall
        .process_request("getSlot", &signed_headers(&accepted))
        .await;
    let PaywallOutcome::PaymentRequired(challenge) = outcome else {
        panic!("expected a re-challenge");
    };
    assert!(challenge.body.error.unwrap().contains("unreachable"));
}

#[tokio::test]
async fn test_settlement_failure_keeps_response() {
    let facilitator = MockFacilitator::new();
    let paywall = paywall(&facilitator);
    let accepted = challenge_requirements(&paywall, "getSlot").await;

    let PaywallOutcome::PaymentValid(payment) = paywall
        .process_request("getSlot", &signed_headers(&accepted))
        .await
    else {
        panic!("expected a valid payment");
    };

    facilitator.set_settle_fails(true);
    let settled = paywall
        .settle_after_response(&payment.payload, &payment.requirements)
        .await;
    assert!(!settled.success);
    assert!(settled.settle_response.is_none());
    assert!(payment_response_header(&settled).is_none());
    assert!(facilitator.settled().is_empty());
}

#[tokio::test]
async fn test_local_verifier_bypasses_facilitator() {
    let facilitator = MockFacilitator::new();
    let paywall = paywall(&facilitator).with_local_verifier(Arc::new(
        |payload: &PaymentPayload, _req: &PaymentRequirements| {
            if payload.payload["signature"] == "0xfeed" {
                VerifyResponse::valid("0xBuyer")
            } else {
                VerifyResponse::invalid("bad signature")
            }
        },
    ));
    let accepted = challenge_requirements(&paywall, "getSlot").await;

    let outcome = paywall
        .process_request("getSlot", &signed_headers(&accepted))
        .await;
    let PaywallOutcome::PaymentValid(payment) = outcome else {
        panic!("expected a valid payment");
    };
    assert_eq!(payment.verify.payer.as_deref(), Some("0xBuyer"));
    assert_eq!(facilitator.verify_calls(), 0);
}

#[tokio::test]
async fn test_challenge_emits_event() {
    let events = EventBus::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    events.subscribe(EventKind::PaymentRequired, move |e| {
        if let GatewayEvent::PaymentRequired { resource, .. } = e {
            sink.lock().unwrap().push(resource.clone());
        }
    });

    let facilitator = MockFacilitator::new();
    let paywall = paywall(&facilitator).with_events(events);
    paywall.process_request("getSlot", &HeaderMap::new()).await;

    assert_eq!(*seen.lock().unwrap(), vec!["rpc://getSlot".to_string()]);
}
