//! Registered agents: software identities acting for users or issuers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrustError};

use super::types::validate_did;

/// Purpose of an agent in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentRole {
    /// A user's personal agent.
    LocalAgent,
    /// Issues credentials on behalf of a trusted issuer.
    IssuerAgent,
    /// Performs specific tasks (banking, travel booking, ...).
    TaskAgent,
    /// Verifies credentials.
    VerifierAgent,
}

impl AgentRole {
    /// Return a stable string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocalAgent => "LOCAL_AGENT",
            Self::IssuerAgent => "ISSUER_AGENT",
            Self::TaskAgent => "TASK_AGENT",
            Self::VerifierAgent => "VERIFIER_AGENT",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A registered agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub did: String,
    /// Short ID (e.g. `agent_0`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub role: AgentRole,
    /// For issuer agents, the issuer they represent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_issuer_did: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub is_system_agent: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl Agent {
    /// Create an active agent with no capabilities.
    pub fn new(did: impl Into<String>, role: AgentRole) -> Self {
        Self {
            did: did.into(),
            agent_id: None,
            role,
            parent_issuer_did: None,
            description: None,
            capabilities: Vec::new(),
            is_system_agent: false,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// Bind the agent to the issuer it acts for.
    pub fn with_parent(mut self, issuer_did: impl Into<String>) -> Self {
        self.parent_issuer_did = Some(issuer_did.into());
        self
    }

    /// Add a capability.
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    /// Whether the agent declares `capability`.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }

    /// Check the record is well formed before it enters the index.
    pub fn validate(&self) -> Result<()> {
        validate_did(&self.did)?;
        if self.role == AgentRole::IssuerAgent && self.parent_issuer_did.is_none() {
            return Err(TrustError::InvalidRecord(format!(
                "issuer agent {} has no parent issuer",
                self.did
            )));
        }
        if let Some(parent) = &self.parent_issuer_did {
            validate_did(parent)?;
        }
        Ok(())
    }
}
