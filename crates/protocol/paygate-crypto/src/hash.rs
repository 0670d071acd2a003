//! SHA-256 helpers.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::canonical::canonical_json;

/// Hex-encoded SHA-256 of raw bytes.
///
/// # Example
/// ```
/// use paygate_crypto::sha256_hex;
///
/// assert_eq!(
///     sha256_hex(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest: [u8; 32] = Sha256::digest(bytes).into();
    hex::encode(digest)
}

/// Hex-encoded SHA-256 of a value's canonical JSON encoding.
pub fn hash_canonical(value: &Value) -> String {
    sha256_hex(canonical_json(value).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hash_deterministic() {
        let v = json!({"slot": 42, "hash": "abc"});
        assert_eq!(hash_canonical(&v), hash_canonical(&v.clone()));
        assert_eq!(hash_canonical(&v).len(), 64);
    }

    #[test]
    fn test_hash_differs_on_change() {
        assert_ne!(
            hash_canonical(&json!({"slot": 42})),
            hash_canonical(&json!({"slot": 43}))
        );
    }
}
