//! Mock implementation of the `Facilitator` trait for testing.
//!
//! Accepts every payment by default. Failure modes are switchable at
//! runtime and every call is counted.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use paygate_x402::{
    Facilitator, PaymentPayload, PaymentRequirements, SettleResponse, SupportedKind,
    SupportedResponse, VerifyResponse, X402Error, X402Result,
};

struct MockFacilitatorInner {
    supported: SupportedResponse,
    /// When set, /verify answers `isValid: false` with this reason.
    reject_reason: Option<String>,
    /// When true, every endpoint fails as if unreachable.
    unreachable: bool,
    /// When true, /settle fails while /verify still works.
    settle_fails: bool,
    payer: String,
    supported_calls: usize,
    verify_calls: usize,
    settle_calls: usize,
    settled: Vec<PaymentRequirements>,
}

/// A mock facilitator.
///
/// Uses `Arc<RwLock<...>>` internally, so clones share state.
#[derive(Clone)]
pub struct MockFacilitator {
    inner: Arc<RwLock<MockFacilitatorInner>>,
}

impl Default for MockFacilitator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFacilitator {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MockFacilitatorInner {
                supported: SupportedResponse::default(),
                reject_reason: None,
                unreachable: false,
                settle_fails: false,
                payer: "BuyerWallet111".to_string(),
                supported_calls: 0,
                verify_calls: 0,
                settle_calls: 0,
                settled: Vec::new(),
            })),
        }
    }

    /// Advertise `fee_payer` for the exact scheme on `network`.
    pub fn with_fee_payer(self, network: &str, fee_payer: &str) -> Self {
        self.inner.write().unwrap().supported.kinds.push(SupportedKind {
            x402_version: Some(2),
            scheme: "exact".to_string(),
            network: network.to_string(),
            extra: Some(serde_json::json!({ "feePayer": fee_payer })),
        });
        self
    }

    /// Reject every payment with `reason`.
    pub fn with_rejection(self, reason: &str) -> Self {
        self.set_rejection(Some(reason));
        self
    }

    pub fn set_rejection(&self, reason: Option<&str>) {
        self.inner.write().unwrap().reject_reason = reason.map(str::to_string);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.inner.write().unwrap().unreachable = unreachable;
    }

    pub fn set_settle_fails(&self, fails: bool) {
        self.inner.write().unwrap().settle_fails = fails;
    }

    // =========================================================================
    // Assertion Helpers
    // =========================================================================

    pub fn supported_calls(&self) -> usize {
        self.inner.read().unwrap().supported_calls
    }

    pub fn verify_calls(&self) -> usize {
        self.inner.read().unwrap().verify_calls
    }

    pub fn settle_calls(&self) -> usize {
        self.inner.read().unwrap().settle_calls
    }

    /// Requirements of every successful settlement.
    pub fn settled(&self) -> Vec<PaymentRequirements> {
        self.inner.read().unwrap().settled.clone()
    }
}

fn unreachable_error() -> X402Error {
    X402Error::Facilitator("mock facilitator unreachable".to_string())
}

#[async_trait]
impl Facilitator for MockFacilitator {
    async fn supported(&self) -> X402Result<SupportedResponse> {
        let mut inner = self.inner.write().unwrap();
        inner.supported_calls += 1;
        if inner.unreachable {
            return Err(unreachable_error());
        }
        Ok(inner.supported.clone())
    }

    async fn verify(
        &self,
        _payload: &PaymentPayload,
        _requirements: &PaymentRequirements,
    ) -> X402Result<VerifyResponse> {
        let mut inner = self.inner.write().unwrap();
        inner.verify_calls += 1;
        if inner.unreachable {
            return Err(unreachable_error());
        }
        match &inner.reject_reason {
            Some(reason) => Err(X402Error::Verify {
                reason: reason.clone(),
                body: Some(format!("{{\"isValid\":false,\"invalidReason\":\"{reason}\"}}")),
            }),
            None => Ok(VerifyResponse::valid(inner.payer.clone())),
        }
    }

    async fn settle(
        &self,
        _payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> X402Result<SettleResponse> {
        let mut inner = self.inner.write().unwrap();
        inner.settle_calls += 1;
        if inner.unreachable {
            return Err(unreachable_error());
        }
        if inner.settle_fails {
            return Err(X402Error::Settle {
                reason: "insufficient_funds".to_string(),
                body: None,
            });
        }
        inner.settled.push(requirements.clone());
        let tx = format!("mock-tx-{}", inner.settled.len());
        Ok(SettleResponse {
            success: true,
            transaction: Some(tx),
            network: Some(requirements.network.clone()),
            payer: Some(inner.payer.clone()),
            error_reason: None,
        })
    }
}
