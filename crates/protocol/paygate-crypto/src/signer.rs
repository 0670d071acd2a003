//! Injected signing capabilities.

use async_trait::async_trait;

use crate::error::CryptoResult;

/// Produces signatures over attestation messages.
///
/// Implementations may be remote (HSM, wallet service), hence async.
#[async_trait]
pub trait AttestationSigner: Send + Sync {
    /// Sign `message`, returning a hex-encoded signature.
    async fn sign(&self, message: &[u8]) -> CryptoResult<String>;

    /// Identifier recorded as the attester, usually a public key.
    fn signer_id(&self) -> String;
}

/// Checks a signature against a message and public key.
///
/// Any `Fn(&[u8], &str, &str) -> bool` closure is a verifier, so hosts can
/// pass a closure wrapping their own scheme.
pub trait SignatureVerifier: Send + Sync {
    /// Return true when `signature` is valid for `message` under `public_key`.
    fn verify(&self, message: &[u8], signature: &str, public_key: &str) -> bool;
}

impl<F> SignatureVerifier for F
where
    F: Fn(&[u8], &str, &str) -> bool + Send + Sync,
{
    fn verify(&self, message: &[u8], signature: &str, public_key: &str) -> bool {
        self(message, signature, public_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check<V: SignatureVerifier>(v: &V) -> bool {
        v.verify(b"m", "sig", "key")
    }

    #[test]
    fn test_closure_is_verifier() {
        assert!(check(&|m: &[u8], s: &str, k: &str| m == b"m" && s == "sig" && k == "key"));
        assert!(!check(&|_: &[u8], _: &str, _: &str| false));
    }
}
