//! Filters for listing issuers and agents.

use crate::policy::CredentialTypePolicy;

use super::agent::{Agent, AgentRole};
use super::types::{AssuranceLevel, Issuer, IssuerType};

/// Filter over issuer records. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct IssuerQuery {
    pub issuer_type: Option<IssuerType>,
    pub assurance: Option<AssuranceLevel>,
    pub is_active: Option<bool>,
    pub is_revoked: Option<bool>,
    /// Only issuers that satisfy this policy's type, domain and assurance rules.
    pub eligible_for: Option<CredentialTypePolicy>,
}

impl IssuerQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issuer_type(mut self, t: IssuerType) -> Self {
        self.issuer_type = Some(t);
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.is_active = Some(active);
        self
    }

    pub fn revoked(mut self, revoked: bool) -> Self {
        self.is_revoked = Some(revoked);
        self
    }

    pub fn eligible_for(mut self, policy: CredentialTypePolicy) -> Self {
        self.eligible_for = Some(policy);
        self
    }

    /// Whether `issuer` passes every set filter.
    pub fn matches(&self, issuer: &Issuer) -> bool {
        self.issuer_type.map_or(true, |t| issuer.issuer_type == t)
            && self.assurance.map_or(true, |a| issuer.assurance == a)
            && self.is_active.map_or(true, |a| issuer.is_active == a)
            && self.is_revoked.map_or(true, |r| issuer.is_revoked == r)
            && self.eligible_for.as_ref().map_or(true, |p| p.admits(issuer))
    }
}

/// Filter over agent records. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct AgentQuery {
    pub role: Option<AgentRole>,
    pub parent_issuer_did: Option<String>,
    pub is_system_agent: Option<bool>,
    pub is_active: Option<bool>,
    pub capability: Option<String>,
}

impl AgentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, role: AgentRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn parent(mut self, issuer_did: impl Into<String>) -> Self {
        self.parent_issuer_did = Some(issuer_did.into());
        self
    }

    pub fn capability(mut self, capability: impl Into<String>) -> Self {
        self.capability = Some(capability.into());
        self
    }

    /// Whether `agent` passes every set filter.
    pub fn matches(&self, agent: &Agent) -> bool {
        self.role.map_or(true, |r| agent.role == r)
            && self
                .parent_issuer_did
                .as_deref()
                .map_or(true, |p| agent.parent_issuer_did.as_deref() == Some(p))
            && self.is_system_agent.map_or(true, |s| agent.is_system_agent == s)
            && self.is_active.map_or(true, |a| agent.is_active == a)
            && self
                .capability
                .as_deref()
                .map_or(true, |c| agent.has_capability(c))
    }
}
