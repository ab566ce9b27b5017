//! In-process receipt registry for local mode and tests.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::Result;
use crate::time::{Clock, SystemClock};

use super::status::{CredentialRecord, ReceiptStatus, ReceiptStatusProvider};

#[derive(Debug, Clone)]
struct Entry {
    record: CredentialRecord,
    revoked: bool,
}

/// Credential records held in memory, with revocation and clock-driven expiry.
pub struct InMemoryReceiptRegistry {
    entries: RwLock<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryReceiptRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Record an issued credential. Replaces any previous record for the hash.
    pub fn register(&self, record: CredentialRecord) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            record.credential_hash.clone(),
            Entry {
                record,
                revoked: false,
            },
        );
    }

    /// Mark a credential revoked. Returns false if the hash is unknown.
    pub fn revoke(&self, credential_hash: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get_mut(credential_hash) {
            Some(entry) => {
                entry.revoked = true;
                true
            }
            None => false,
        }
    }

    /// Current status, evaluated against the registry's clock.
    pub fn status(&self, credential_hash: &str) -> ReceiptStatus {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = entries.get(credential_hash) else {
            return ReceiptStatus::Unknown;
        };
        if entry.revoked {
            return ReceiptStatus::Revoked;
        }
        let now = self.clock.now_secs();
        if entry.record.expires_at.is_some_and(|exp| exp < now) {
            return ReceiptStatus::Expired;
        }
        ReceiptStatus::Valid(entry.record.clone())
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryReceiptRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReceiptStatusProvider for InMemoryReceiptRegistry {
    fn name(&self) -> &str {
        "in-memory-receipts"
    }

    async fn check(&self, credential_hash: &str) -> Result<ReceiptStatus> {
        Ok(self.status(credential_hash))
    }
}
