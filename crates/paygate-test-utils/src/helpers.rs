//! Fixture builders.
//!
//! Every fixture sells as [`SELLER_ID`] so intents line up with
//! [`gateway_config`].

use std::sync::atomic::{AtomicU64, Ordering};

use paygate_crypto::Ed25519Signer;
use paygate_ops::{GatewayConfig, MethodConfig, SellerConfig};
use paygate_types::{now_ms, AgentIdentity, Amount, PaymentIntent, PricingTier};

pub const SELLER_ID: &str = "seller-1";
pub const BUYER_ID: &str = "buyer-1";

static NONCE: AtomicU64 = AtomicU64::new(0);

/// A nonce unique within the test process.
pub fn next_nonce() -> String {
    format!("nonce-{}", NONCE.fetch_add(1, Ordering::SeqCst))
}

pub fn seller_identity() -> AgentIdentity {
    AgentIdentity::new(SELLER_ID, "Test Seller", "SellerWallet111")
}

pub fn buyer_identity() -> AgentIdentity {
    AgentIdentity::new(BUYER_ID, "Test Buyer", "BuyerWallet111")
}

/// Unsigned, non-expiring intent from the test buyer to the test seller.
pub fn intent_fixture(tier_id: &str, max_budget: Amount) -> PaymentIntent {
    PaymentIntent {
        nonce: next_nonce(),
        buyer: buyer_identity(),
        seller: seller_identity(),
        tier_id: tier_id.to_string(),
        max_budget,
        token: "USDC".to_string(),
        signature: String::new(),
        created_at: now_ms(),
        ttl: 0,
    }
}

/// Intent signed by `signer`, whose public key becomes the buyer's wallet.
pub fn signed_intent(signer: &Ed25519Signer, tier_id: &str, max_budget: Amount) -> PaymentIntent {
    let mut intent = intent_fixture(tier_id, max_budget);
    intent.buyer.wallet_address = signer.public_key_hex();
    intent.signature = signer.sign_hex(intent.signing_message().as_bytes());
    intent
}

/// `basic` (1000/call, unlimited) and `pro` (5000/call, 100 calls,
/// attested) tiers.
pub fn standard_tiers() -> Vec<PricingTier> {
    vec![
        PricingTier::new("basic", "Basic", 1_000).with_rate_limit(100),
        PricingTier::new("pro", "Pro", 5_000)
            .with_max_calls(100)
            .with_rate_limit(100)
            .with_attestation(true),
    ]
}

/// Gateway config for the test seller serving `methods` on the standard
/// tiers, x402 disabled.
pub fn gateway_config(methods: &[&str]) -> GatewayConfig {
    GatewayConfig {
        seller: SellerConfig {
            id: SELLER_ID.to_string(),
            name: "Test Seller".to_string(),
            wallet_address: "SellerWallet111".to_string(),
            region: Some("us-east".to_string()),
            tags: vec![],
        },
        tiers: standard_tiers(),
        methods: methods.iter().map(|m| MethodConfig::new(*m)).collect(),
        ..Default::default()
    }
}
