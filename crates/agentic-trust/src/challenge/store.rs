//! The replay gate: issue nonces, consume each at most once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::crypto::random::{random_nonce_hex, MIN_NONCE_BYTES};
use crate::error::{Result, TrustError};
use crate::time::{Clock, SystemClock};

use super::types::{Challenge, ChallengeConfig, ChallengeError, ChallengeStats};

#[derive(Debug, Default)]
struct Counters {
    issued: AtomicU64,
    consumed: AtomicU64,
    expired: AtomicU64,
    not_found: AtomicU64,
    swept: AtomicU64,
}

/// Pending challenges keyed by nonce.
///
/// Lookup and removal in [`ChallengeStore::consume`] happen under one lock,
/// so for any nonce at most one caller ever succeeds.
pub struct ChallengeStore {
    pending: Mutex<HashMap<String, Challenge>>,
    config: ChallengeConfig,
    clock: Arc<dyn Clock>,
    counters: Counters,
}

impl ChallengeStore {
    pub fn new(config: ChallengeConfig) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            config,
            clock: Arc::new(SystemClock),
            counters: Counters::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ChallengeConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Challenge>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Issue a challenge for `audience` valid for `ttl_secs`.
    pub fn issue(&self, audience: &str, ttl_secs: u64) -> Result<Challenge> {
        if audience.trim().is_empty() {
            return Err(TrustError::InvalidChallenge("audience is empty".into()));
        }
        if ttl_secs == 0 {
            return Err(TrustError::InvalidChallenge("ttl must be positive".into()));
        }

        let now = self.clock.now_secs();
        let nonce_len = self.config.nonce_bytes.max(MIN_NONCE_BYTES);
        let mut pending = self.lock();

        if pending.len() >= self.config.max_pending {
            let before = pending.len();
            pending.retain(|_, c| !c.is_expired_at(now));
            let removed = (before - pending.len()) as u64;
            self.counters.swept.fetch_add(removed, Ordering::Relaxed);
            if pending.len() >= self.config.max_pending {
                tracing::warn!(pending = pending.len(), "challenge store at capacity");
                return Err(TrustError::ChallengeCapacity(pending.len()));
            }
        }

        let mut nonce = random_nonce_hex(nonce_len);
        while pending.contains_key(&nonce) {
            nonce = random_nonce_hex(nonce_len);
        }
        let challenge = Challenge {
            nonce: nonce.clone(),
            aud: audience.to_string(),
            exp: now.saturating_add(ttl_secs),
        };
        pending.insert(nonce, challenge.clone());
        self.counters.issued.fetch_add(1, Ordering::Relaxed);
        Ok(challenge)
    }

    /// Issue a challenge with the configured default TTL.
    pub fn issue_default(&self, audience: &str) -> Result<Challenge> {
        self.issue(audience, self.config.default_ttl_secs)
    }

    /// Remove and return the challenge for `nonce`.
    ///
    /// An expired challenge is removed as well, and reported as expired.
    pub fn consume(&self, nonce: &str) -> std::result::Result<Challenge, ChallengeError> {
        let now = self.clock.now_secs();
        let removed = self.lock().remove(nonce);
        match removed {
            None => {
                self.counters.not_found.fetch_add(1, Ordering::Relaxed);
                Err(ChallengeError::NotFound)
            }
            Some(c) if c.is_expired_at(now) => {
                self.counters.expired.fetch_add(1, Ordering::Relaxed);
                Err(ChallengeError::Expired)
            }
            Some(c) => {
                self.counters.consumed.fetch_add(1, Ordering::Relaxed);
                Ok(c)
            }
        }
    }

    /// Delete every expired challenge. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now_secs();
        let mut pending = self.lock();
        let before = pending.len();
        pending.retain(|_, c| !c.is_expired_at(now));
        let removed = before - pending.len();
        drop(pending);
        if removed > 0 {
            self.counters.swept.fetch_add(removed as u64, Ordering::Relaxed);
            tracing::debug!(removed, "swept expired challenges");
        }
        removed
    }

    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    pub fn stats(&self) -> ChallengeStats {
        ChallengeStats {
            pending: self.pending(),
            issued: self.counters.issued.load(Ordering::Relaxed),
            consumed: self.counters.consumed.load(Ordering::Relaxed),
            expired: self.counters.expired.load(Ordering::Relaxed),
            not_found: self.counters.not_found.load(Ordering::Relaxed),
            swept: self.counters.swept.load(Ordering::Relaxed),
        }
    }
}

impl Default for ChallengeStore {
    fn default() -> Self {
        Self::new(ChallengeConfig::default())
    }
}

impl std::fmt::Debug for ChallengeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChallengeStore")
            .field("config", &self.config)
            .field("pending", &self.pending())
            .finish()
    }
}
