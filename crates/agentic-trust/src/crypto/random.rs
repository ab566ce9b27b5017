//! Secure random number generation.
//!
//! Uses the operating system's cryptographic random source via `rand`.

use rand::rngs::OsRng;
use rand::RngCore;

/// Smallest nonce the challenge store will hand out, in bytes.
pub const MIN_NONCE_BYTES: usize = 16;

/// Fill a buffer with cryptographically secure random bytes.
pub fn fill_random(buf: &mut [u8]) {
    OsRng.fill_bytes(buf);
}

/// Generate a hex-encoded nonce of `len` random bytes.
///
/// `len` is raised to [`MIN_NONCE_BYTES`] if smaller.
pub fn random_nonce_hex(len: usize) -> String {
    let mut buf = vec![0u8; len.max(MIN_NONCE_BYTES)];
    fill_random(&mut buf);
    hex::encode(buf)
}
