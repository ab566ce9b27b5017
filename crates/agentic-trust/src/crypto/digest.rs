//! SHA-256 helpers for record keys.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Filesystem-safe key for a DID.
///
/// DIDs contain `:` and may contain `/`, so records are stored under the
/// first 32 hex chars of the DID's hash.
pub fn did_key(did: &str) -> String {
    let mut key = sha256_hex(did.as_bytes());
    key.truncate(32);
    key
}
