//! Challenge records, configuration and errors.

use serde::{Deserialize, Serialize};

/// A single-use verification challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// Hex of at least 16 random bytes.
    pub nonce: String,
    /// The relying party the challenge was issued for.
    pub aud: String,
    /// Expiry, unix seconds. Still valid at exactly `exp`.
    pub exp: u64,
}

impl Challenge {
    pub fn is_expired_at(&self, now_secs: u64) -> bool {
        self.exp < now_secs
    }
}

/// Why a nonce could not be consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChallengeError {
    #[error("challenge expired")]
    Expired,
    #[error("challenge not found")]
    NotFound,
}

/// Challenge store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeConfig {
    pub default_ttl_secs: u64,
    /// Upper bound on unconsumed challenges held in memory.
    pub max_pending: usize,
    pub sweep_interval_secs: u64,
    /// Random bytes per nonce (never fewer than 16).
    pub nonce_bytes: usize,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 60,
            max_pending: 100_000,
            sweep_interval_secs: 30,
            nonce_bytes: 16,
        }
    }
}

/// Counters since the store was created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeStats {
    pub pending: usize,
    pub issued: u64,
    pub consumed: u64,
    pub expired: u64,
    pub not_found: u64,
    pub swept: u64,
}
