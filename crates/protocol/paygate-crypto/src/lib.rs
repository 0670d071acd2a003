//! Hashing and signing primitives for the paygate gateway.
//!
//! The gateway core never depends on a particular signature scheme. Signing
//! and verification are injected as capabilities ([`AttestationSigner`] and
//! [`SignatureVerifier`]); this crate defines those seams and ships an
//! Ed25519 implementation for hosts that do not bring their own.
//!
//! - **Canonical JSON**: stable key ordering so equal values hash equally
//! - **Hashing**: SHA-256, hex-encoded
//! - **Signing**: async signer trait, sync verifier trait, Ed25519 impls
//!
//! # Example
//!
//! ```
//! use paygate_crypto::{hash_canonical, Ed25519Signer, Ed25519Verifier, SignatureVerifier};
//! use serde_json::json;
//!
//! let a = hash_canonical(&json!({"b": 1, "a": 2}));
//! let b = hash_canonical(&json!({"a": 2, "b": 1}));
//! assert_eq!(a, b);
//!
//! let signer = Ed25519Signer::generate();
//! let sig = signer.sign_hex(b"hello");
//! assert!(Ed25519Verifier.verify(b"hello", &sig, &signer.public_key_hex()));
//! ```

mod canonical;
mod ed25519;
mod error;
mod hash;
mod signer;

pub use canonical::canonical_json;
pub use ed25519::{Ed25519Signer, Ed25519Verifier};
pub use error::{CryptoError, CryptoResult};
pub use hash::{hash_canonical, sha256_hex};
pub use signer::{AttestationSigner, SignatureVerifier};
