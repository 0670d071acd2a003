//! Ed25519 signer and verifier.
//!
//! Messages are hashed with SHA-256 before signing:
//! ```text
//! signature = Ed25519_Sign(secret_key, H(message))
//! ```
//! Keys and signatures travel as lowercase hex.

use async_trait::async_trait;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::error::{CryptoError, CryptoResult};
use crate::signer::{AttestationSigner, SignatureVerifier};

fn digest(message: &[u8]) -> [u8; 32] {
    Sha256::digest(message).into()
}

/// Ed25519 attestation signer holding a secret key in memory.
pub struct Ed25519Signer {
    signing_key: SigningKey,
}

impl Ed25519Signer {
    /// Generate a fresh keypair.
    pub fn generate() -> Self {
        let mut csprng = OsRng;
        Self {
            signing_key: SigningKey::generate(&mut csprng),
        }
    }

    /// Load from a hex-encoded 32-byte secret key.
    pub fn from_secret_hex(secret: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(secret.trim())?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&bytes),
        })
    }

    /// Hex-encoded public key.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign synchronously, returning a hex signature.
    pub fn sign_hex(&self, message: &[u8]) -> String {
        let sig: Signature = self.signing_key.sign(&digest(message));
        hex::encode(sig.to_bytes())
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AttestationSigner for Ed25519Signer {
    async fn sign(&self, message: &[u8]) -> CryptoResult<String> {
        Ok(self.sign_hex(message))
    }

    fn signer_id(&self) -> String {
        self.public_key_hex()
    }
}

/// Verifier for signatures produced by [`Ed25519Signer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl Ed25519Verifier {
    /// Verify, reporting malformed inputs as errors instead of `false`.
    pub fn verify_strict(
        &self,
        message: &[u8],
        signature: &str,
        public_key: &str,
    ) -> CryptoResult<()> {
        let key_bytes: [u8; 32] = decode_fixed(public_key)?;
        let sig_bytes: [u8; 64] = decode_fixed(signature)?;
        let key = VerifyingKey::from_bytes(&key_bytes)
            .map_err(|_| CryptoError::SignatureVerificationFailed)?;
        let sig = Signature::from_bytes(&sig_bytes);
        key.verify(&digest(message), &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, message: &[u8], signature: &str, public_key: &str) -> bool {
        self.verify_strict(message, signature, public_key).is_ok()
    }
}

fn decode_fixed<const N: usize>(s: &str) -> CryptoResult<[u8; N]> {
    let bytes = hex::decode(s.trim())?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyLength {
            expected: N,
            actual: bytes.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let signer = Ed25519Signer::generate();
        let sig = signer.sign_hex(b"getSlot|aa|bb|42");
        assert_eq!(sig.len(), 128);
        assert!(Ed25519Verifier.verify(b"getSlot|aa|bb|42", &sig, &signer.public_key_hex()));
        assert!(!Ed25519Verifier.verify(b"getSlot|aa|bb|43", &sig, &signer.public_key_hex()));
    }

    #[test]
    fn test_wrong_key_fails() {
        let a = Ed25519Signer::generate();
        let b = Ed25519Signer::generate();
        let sig = a.sign_hex(b"msg");
        assert!(!Ed25519Verifier.verify(b"msg", &sig, &b.public_key_hex()));
    }

    #[test]
    fn test_from_secret_hex_is_deterministic() {
        let secret = "11".repeat(32);
        let a = Ed25519Signer::from_secret_hex(&secret).unwrap();
        let b = Ed25519Signer::from_secret_hex(&secret).unwrap();
        assert_eq!(a.public_key_hex(), b.public_key_hex());
        assert_eq!(a.sign_hex(b"x"), b.sign_hex(b"x"));
    }

    #[test]
    fn test_bad_inputs() {
        assert!(matches!(
            Ed25519Signer::from_secret_hex("abcd"),
            Err(CryptoError::InvalidKeyLength { expected: 32, actual: 2 })
        ));
        assert!(matches!(
            Ed25519Signer::from_secret_hex("zz"),
            Err(CryptoError::InvalidHex(_))
        ));
        assert!(!Ed25519Verifier.verify(b"m", "not-hex", "also-not-hex"));
    }

    #[tokio::test]
    async fn test_async_signer_matches_sync() {
        let signer = Ed25519Signer::generate();
        let sig = AttestationSigner::sign(&signer, b"m").await.unwrap();
        assert_eq!(sig, signer.sign_hex(b"m"));
        assert_eq!(signer.signer_id(), signer.public_key_hex());
    }
}
