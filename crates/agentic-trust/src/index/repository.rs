//! Authoritative stores behind the hot cache.
//!
//! The index only talks to these traits. In-memory implementations live
//! here; filesystem implementations live in [`crate::storage`].

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Result, TrustError};
use crate::issuer::{Agent, Issuer};

/// Persistent issuer records keyed by DID.
pub trait IssuerRepository: Send + Sync {
    fn get(&self, did: &str) -> Result<Option<Issuer>>;
    /// Returns whether the DID was new to the repository.
    fn put(&self, issuer: &Issuer) -> Result<bool>;
    /// Returns whether a record was removed.
    fn remove(&self, did: &str) -> Result<bool>;
    fn list(&self) -> Result<Vec<Issuer>>;
    /// Number of stored records, without loading them.
    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Persistent agent records keyed by DID.
pub trait AgentRepository: Send + Sync {
    fn get(&self, did: &str) -> Result<Option<Agent>>;
    /// Returns whether the DID was new to the repository.
    fn put(&self, agent: &Agent) -> Result<bool>;
    fn remove(&self, did: &str) -> Result<bool>;
    fn list(&self) -> Result<Vec<Agent>>;
    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn poisoned() -> TrustError {
    TrustError::StorageError("repository lock poisoned".into())
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Issuer repository held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryIssuerRepository {
    records: RwLock<HashMap<String, Issuer>>,
}

impl InMemoryIssuerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IssuerRepository for InMemoryIssuerRepository {
    fn get(&self, did: &str) -> Result<Option<Issuer>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.get(did).cloned())
    }

    fn put(&self, issuer: &Issuer) -> Result<bool> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        Ok(records.insert(issuer.did.clone(), issuer.clone()).is_none())
    }

    fn remove(&self, did: &str) -> Result<bool> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        Ok(records.remove(did).is_some())
    }

    fn list(&self) -> Result<Vec<Issuer>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        let mut all: Vec<Issuer> = records.values().cloned().collect();
        all.sort_by(|a, b| a.did.cmp(&b.did));
        Ok(all)
    }

    fn len(&self) -> Result<usize> {
        Ok(self.records.read().map_err(|_| poisoned())?.len())
    }
}

/// Agent repository held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryAgentRepository {
    records: RwLock<HashMap<String, Agent>>,
}

impl InMemoryAgentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AgentRepository for InMemoryAgentRepository {
    fn get(&self, did: &str) -> Result<Option<Agent>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.get(did).cloned())
    }

    fn put(&self, agent: &Agent) -> Result<bool> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        Ok(records.insert(agent.did.clone(), agent.clone()).is_none())
    }

    fn remove(&self, did: &str) -> Result<bool> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        Ok(records.remove(did).is_some())
    }

    fn list(&self) -> Result<Vec<Agent>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        let mut all: Vec<Agent> = records.values().cloned().collect();
        all.sort_by(|a, b| a.did.cmp(&b.did));
        Ok(all)
    }

    fn len(&self) -> Result<usize> {
        Ok(self.records.read().map_err(|_| poisoned())?.len())
    }
}
