//! Credential hashing for webhook authentication.
//!
//! Webhook keys are never stored or compared in plaintext: configuration
//! holds their SHA-256 digests and incoming credentials are hashed before
//! lookup. The digest prefix doubles as a stable, non-reversible origin
//! label for throttling and audit records.

use sha2::{Digest, Sha256};

/// SHA-256 digest of the input, lowercase hex.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Short non-reversible identifier for an authenticated credential.
/// First 8 hex chars of the key digest.
pub fn key_fingerprint(key: &str) -> String {
    sha256_hex(key)[..8].to_string()
}
