//! The authoritative registry consulted when local tiers miss.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::issuer::{Agent, AgentRole, AssuranceLevel, Issuer, IssuerDomain, IssuerType};

pub const TRUSTED_ISSUER_0_DID: &str = "did:agentic:trusted_issuer_0";
pub const ISSUER_AGENT_0_DID: &str = "did:agentic:agent_0";
pub const CANONICAL_AGENT_101_DID: &str = "did:agentic:canonical_agent_101";

/// Every record the registry holds, for full syncs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    #[serde(default)]
    pub issuers: Vec<Issuer>,
    #[serde(default)]
    pub agents: Vec<Agent>,
}

/// Source of truth for issuer and agent records (on-chain registry or a proxy).
///
/// `Ok(None)` means the registry answered and has no such record; an `Err`
/// means it could not answer.
#[async_trait]
pub trait RegistrySource: Send + Sync {
    /// Name used in logs and retry diagnostics.
    fn name(&self) -> &str;

    async fn fetch_issuer(&self, did: &str) -> Result<Option<Issuer>>;

    async fn fetch_agent(&self, did: &str) -> Result<Option<Agent>>;

    async fn snapshot(&self) -> Result<RegistrySnapshot>;
}

/// A registry backed by a fixed in-process snapshot.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    issuers: HashMap<String, Issuer>,
    agents: HashMap<String, Agent>,
}

impl StaticRegistry {
    pub fn new(snapshot: RegistrySnapshot) -> Self {
        Self {
            issuers: snapshot
                .issuers
                .into_iter()
                .map(|i| (i.did.clone(), i))
                .collect(),
            agents: snapshot
                .agents
                .into_iter()
                .map(|a| (a.did.clone(), a))
                .collect(),
        }
    }

    /// The canonical protocol records: trusted issuer 0, its issuer agent,
    /// and the default local agent.
    pub fn bootstrap() -> Self {
        Self::new(bootstrap_snapshot())
    }

    pub fn with_issuer(mut self, issuer: Issuer) -> Self {
        self.issuers.insert(issuer.did.clone(), issuer);
        self
    }

    pub fn with_agent(mut self, agent: Agent) -> Self {
        self.agents.insert(agent.did.clone(), agent);
        self
    }
}

#[async_trait]
impl RegistrySource for StaticRegistry {
    fn name(&self) -> &str {
        "static-registry"
    }

    async fn fetch_issuer(&self, did: &str) -> Result<Option<Issuer>> {
        Ok(self.issuers.get(did).cloned())
    }

    async fn fetch_agent(&self, did: &str) -> Result<Option<Agent>> {
        Ok(self.agents.get(did).cloned())
    }

    async fn snapshot(&self) -> Result<RegistrySnapshot> {
        let mut issuers: Vec<Issuer> = self.issuers.values().cloned().collect();
        issuers.sort_by(|a, b| a.did.cmp(&b.did));
        let mut agents: Vec<Agent> = self.agents.values().cloned().collect();
        agents.sort_by(|a, b| a.did.cmp(&b.did));
        Ok(RegistrySnapshot { issuers, agents })
    }
}

fn genesis() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 14, 12, 0, 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Records every deployment starts with.
pub fn bootstrap_snapshot() -> RegistrySnapshot {
    let mut issuer0 = Issuer::new(
        TRUSTED_ISSUER_0_DID,
        IssuerType::Corporation,
        AssuranceLevel::RegulatedEntity,
        "AgenticDID Foundation",
    )
    .with_domain(IssuerDomain::Financial)
    .with_brand("AgenticDID")
    .with_jurisdiction("US-DE");
    issuer0.registered_by = Some("did:agentic:protocol:admin".into());
    issuer0.created_at = genesis();

    let mut agent0 = Agent::new(ISSUER_AGENT_0_DID, AgentRole::IssuerAgent)
        .with_parent(TRUSTED_ISSUER_0_DID)
        .with_capability("kyc")
        .with_capability("credential_issuance")
        .with_capability("revocation");
    agent0.agent_id = Some("agent_0".into());
    agent0.description = Some("Canonical issuer agent for trusted_issuer_0".into());
    agent0.is_system_agent = true;
    agent0.created_at = genesis();

    let mut comet = Agent::new(CANONICAL_AGENT_101_DID, AgentRole::LocalAgent)
        .with_capability("credential_management")
        .with_capability("proof_generation")
        .with_capability("task_delegation");
    comet.agent_id = Some("canonical_agent_101".into());
    comet.description = Some("Comet - canonical local agent for users".into());
    comet.created_at = genesis();

    RegistrySnapshot {
        issuers: vec![issuer0],
        agents: vec![agent0, comet],
    }
}
