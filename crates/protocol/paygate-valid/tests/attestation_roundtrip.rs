//! Attestation produced by one party, verified by another.

use std::sync::Arc;

use paygate_crypto::{Ed25519Signer, Ed25519Verifier};
use paygate_test_utils::ManualClock;
use paygate_valid::{ResponseValidator, ValidatorConfig};
use serde_json::json;

fn params() -> serde_json::Value {
    json!(["9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin", {"commitment": "finalized"}])
}

fn response() -> serde_json::Value {
    json!({"context": {"slot": 250_000_123u64}, "value": 1_500_000_000u64})
}

#[tokio::test]
async fn test_integrity_holds_for_identical_data() {
    let validator = ResponseValidator::default();
    let att = validator
        .attest("sess_1", "getBalance", &params(), &response(), 250_000_123)
        .await
        .unwrap();

    let report = ResponseValidator::verify_integrity(&att, &params(), &response());
    assert!(report.request_match);
    assert!(report.response_match);
    assert!(report.valid);
}

#[tokio::test]
async fn test_key_order_does_not_matter() {
    let validator = ResponseValidator::default();
    let att = validator
        .attest("sess_1", "getBalance", &params(), &response(), 1)
        .await
        .unwrap();

    let reordered = json!({"value": 1_500_000_000u64, "context": {"slot": 250_000_123u64}});
    assert!(ResponseValidator::verify_integrity(&att, &params(), &reordered).valid);
}

#[tokio::test]
async fn test_tampered_response_is_pinpointed() {
    let validator = ResponseValidator::default();
    let att = validator
        .attest("sess_1", "getBalance", &params(), &response(), 1)
        .await
        .unwrap();

    let mut forged = response();
    forged["value"] = json!(9_999_999_999u64);
    let report = ResponseValidator::verify_integrity(&att, &params(), &forged);
    assert!(report.request_match);
    assert!(!report.response_match);
    assert!(!report.valid);

    let report = ResponseValidator::verify_integrity(&att, &json!([]), &response());
    assert!(!report.request_match);
    assert!(report.response_match);
    assert!(!report.valid);
}

#[tokio::test]
async fn test_ed25519_signed_attestation_verifies() {
    let signer = Arc::new(Ed25519Signer::generate());
    let public_key = signer.public_key_hex();
    let clock = ManualClock::new(1_700_000_000_000);
    let validator = ResponseValidator::new(ValidatorConfig::default())
        .with_signer(signer)
        .with_clock(clock.shared());

    let att = validator
        .attest("sess_2", "getSlot", &json!([]), &json!(42), 42)
        .await
        .unwrap();
    assert!(att.is_signed());
    assert_eq!(att.attester_id, public_key);
    assert_eq!(att.timestamp, 1_700_000_000_000);

    assert!(ResponseValidator::verify_signature(&att, &Ed25519Verifier, &public_key));

    let mut moved = att.clone();
    moved.slot = 43;
    assert!(!ResponseValidator::verify_signature(&moved, &Ed25519Verifier, &public_key));

    let other = Ed25519Signer::generate().public_key_hex();
    assert!(!ResponseValidator::verify_signature(&att, &Ed25519Verifier, &other));
}

#[tokio::test]
async fn test_ring_keeps_only_newest_entries() {
    let validator = ResponseValidator::new(ValidatorConfig::default().with_capacity(10));
    for slot in 0..25u64 {
        validator
            .attest("sess_3", "getSlot", &json!([]), &json!(slot), slot)
            .await
            .unwrap();
    }
    assert_eq!(validator.count(), 10);
    let exported = validator.export();
    assert_eq!(exported.first().unwrap().slot, 15);
    assert_eq!(exported.last().unwrap().slot, 24);
}
