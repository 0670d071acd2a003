//! The response validator.

use std::sync::{Arc, PoisonError, RwLock};

use paygate_crypto::{hash_canonical, AttestationSigner, SignatureVerifier};
use paygate_types::{SharedClock, SystemClock};
use serde_json::Value;
use tracing::debug;

use crate::attestation::{signing_message, IntegrityReport, ResponseAttestation};
use crate::config::ValidatorConfig;
use crate::error::AttestResult;
use crate::ring::RingBuffer;

const UNSIGNED_ATTESTER: &str = "unsigned";

/// Produces and stores response attestations.
///
/// Attestations are kept in a fixed-capacity ring; the oldest is evicted
/// first once it fills up. Verification helpers are associated functions and
/// need no validator instance.
pub struct ResponseValidator {
    signer: Option<Arc<dyn AttestationSigner>>,
    attester_id: String,
    log: RwLock<RingBuffer<ResponseAttestation>>,
    clock: SharedClock,
}

impl ResponseValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        let attester_id = config
            .attester_id
            .clone()
            .unwrap_or_else(|| UNSIGNED_ATTESTER.to_string());
        Self {
            signer: None,
            attester_id,
            log: RwLock::new(RingBuffer::new(config.capacity)),
            clock: SystemClock::shared(),
        }
    }

    /// Sign attestations with `signer`.
    ///
    /// The attester id becomes the signer's id unless one was configured.
    pub fn with_signer(mut self, signer: Arc<dyn AttestationSigner>) -> Self {
        if self.attester_id == UNSIGNED_ATTESTER {
            self.attester_id = signer.signer_id();
        }
        self.signer = Some(signer);
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn attester_id(&self) -> &str {
        &self.attester_id
    }

    pub fn capacity(&self) -> usize {
        self.read_log().capacity()
    }

    // =========================================================================
    // Attest
    // =========================================================================

    /// Hash a request/response pair, sign it if a signer is set, and log it.
    pub async fn attest(
        &self,
        session_id: &str,
        method: &str,
        params: &Value,
        response: &Value,
        slot: u64,
    ) -> AttestResult<ResponseAttestation> {
        let request_hash = hash_canonical(params);
        let response_hash = hash_canonical(response);
        let message = signing_message(method, &request_hash, &response_hash, slot);

        let signature = match &self.signer {
            Some(signer) => signer.sign(message.as_bytes()).await?,
            None => String::new(),
        };

        let attestation = ResponseAttestation {
            session_id: session_id.to_string(),
            method: method.to_string(),
            request_hash,
            response_hash,
            slot,
            attester_id: self.attester_id.clone(),
            signature,
            timestamp: self.clock.now_ms(),
        };

        let evicted = self
            .log
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(attestation.clone());
        if let Some(old) = evicted {
            debug!(session_id = %old.session_id, method = %old.method, "Evicted oldest attestation");
        }
        Ok(attestation)
    }

    // =========================================================================
    // Verify
    // =========================================================================

    /// Recompute both hashes and compare them to the attestation.
    pub fn verify_integrity(
        attestation: &ResponseAttestation,
        params: &Value,
        response: &Value,
    ) -> IntegrityReport {
        let request_match = hash_canonical(params) == attestation.request_hash;
        let response_match = hash_canonical(response) == attestation.response_hash;
        IntegrityReport {
            request_match,
            response_match,
            valid: request_match && response_match,
        }
    }

    /// Check the attestation's signature with an injected verifier.
    ///
    /// Unsigned attestations never verify.
    pub fn verify_signature<V>(
        attestation: &ResponseAttestation,
        verifier: &V,
        public_key: &str,
    ) -> bool
    where
        V: SignatureVerifier + ?Sized,
    {
        if !attestation.is_signed() {
            return false;
        }
        verifier.verify(
            attestation.signing_message().as_bytes(),
            &attestation.signature,
            public_key,
        )
    }

    // =========================================================================
    // Query
    // =========================================================================

    /// Attestations for one session, oldest first.
    pub fn by_session(&self, session_id: &str) -> Vec<ResponseAttestation> {
        self.read_log()
            .iter()
            .filter(|a| a.session_id == session_id)
            .cloned()
            .collect()
    }

    /// Up to `limit` most recent attestations for `method`, newest first.
    pub fn by_method(&self, method: &str, limit: usize) -> Vec<ResponseAttestation> {
        self.read_log()
            .iter()
            .rev()
            .filter(|a| a.method == method)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Attestations currently retained.
    pub fn count(&self) -> usize {
        self.read_log().len()
    }

    /// Every retained attestation, oldest first.
    pub fn export(&self) -> Vec<ResponseAttestation> {
        self.read_log().iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<ResponseAttestation> {
        self.read_log().newest().cloned()
    }

    fn read_log(&self) -> std::sync::RwLockReadGuard<'_, RingBuffer<ResponseAttestation>> {
        self.log.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ResponseValidator {
    fn default() -> Self {
        Self::new(ValidatorConfig::default())
    }
}

impl std::fmt::Debug for ResponseValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseValidator")
            .field("attester_id", &self.attester_id)
            .field("signed", &self.signer.is_some())
            .field("count", &self.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use paygate_crypto::{CryptoError, CryptoResult};
    use serde_json::json;

    struct FailingSigner;

    #[async_trait]
    impl AttestationSigner for FailingSigner {
        async fn sign(&self, _message: &[u8]) -> CryptoResult<String> {
            Err(CryptoError::SigningFailed("hsm offline".into()))
        }

        fn signer_id(&self) -> String {
            "hsm".into()
        }
    }

    #[tokio::test]
    async fn test_unsigned_attestation() {
        let validator = ResponseValidator::default();
        let att = validator
            .attest("s1", "getSlot", &json!([]), &json!(123), 123)
            .await
            .unwrap();
        assert!(!att.is_signed());
        assert_eq!(att.attester_id, "unsigned");
        assert_eq!(
            att.signing_message(),
            format!("getSlot|{}|{}|123", att.request_hash, att.response_hash)
        );
        assert_eq!(validator.count(), 1);
    }

    #[tokio::test]
    async fn test_signer_failure_is_not_logged() {
        let validator = ResponseValidator::default().with_signer(Arc::new(FailingSigner));
        assert_eq!(validator.attester_id(), "hsm");
        let err = validator
            .attest("s1", "getSlot", &json!([]), &json!(1), 1)
            .await
            .unwrap_err();
        assert_eq!(err.code(), paygate_types::ErrorCode::AttestationFailed);
        assert_eq!(validator.count(), 0);
    }

    #[tokio::test]
    async fn test_queries() {
        let validator = ResponseValidator::new(ValidatorConfig::default().with_capacity(4));
        for (i, (session, method)) in [("a", "getSlot"), ("b", "getSlot"), ("a", "getBalance"), ("a", "getSlot")]
            .into_iter()
            .enumerate()
        {
            validator
                .attest(session, method, &json!({"i": i}), &json!(i), i as u64)
                .await
                .unwrap();
        }

        assert_eq!(validator.by_session("a").len(), 3);
        let recent = validator.by_method("getSlot", 2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].slot, 3);
        assert_eq!(recent[1].slot, 1);
        assert_eq!(validator.latest().unwrap().slot, 3);

        // one more evicts slot 0
        validator
            .attest("c", "getSlot", &json!({}), &json!(null), 4)
            .await
            .unwrap();
        let exported = validator.export();
        assert_eq!(exported.len(), 4);
        assert_eq!(exported[0].slot, 1);
        assert_eq!(exported[3].slot, 4);
    }

    #[test]
    fn test_verify_signature_rejects_unsigned() {
        let att = ResponseAttestation {
            session_id: "s".into(),
            method: "m".into(),
            request_hash: "a".into(),
            response_hash: "b".into(),
            slot: 0,
            attester_id: "unsigned".into(),
            signature: String::new(),
            timestamp: 0,
        };
        let always = |_: &[u8], _: &str, _: &str| true;
        assert!(!ResponseValidator::verify_signature(&att, &always, "key"));
    }
}
