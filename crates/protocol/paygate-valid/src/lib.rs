//! Response attestation for the paygate gateway.
//!
//! The [`ResponseValidator`] hashes each request/response pair over a
//! canonical JSON encoding, signs `method|requestHash|responseHash|slot` with
//! an injected signer when one is configured, and keeps the result in a
//! fixed-capacity ring buffer.
//!
//! Verification is stateless: [`ResponseValidator::verify_integrity`]
//! recomputes hashes from the data a client holds, and
//! [`ResponseValidator::verify_signature`] delegates to any
//! [`SignatureVerifier`](paygate_crypto::SignatureVerifier).

mod attestation;
mod config;
mod error;
mod ring;
mod validator;

pub use attestation::{IntegrityReport, ResponseAttestation};
pub use config::ValidatorConfig;
pub use error::{AttestError, AttestResult};
pub use ring::RingBuffer;
pub use validator::ResponseValidator;
