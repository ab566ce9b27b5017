//! Issuer and agent records.
//!
//! The issuer module provides:
//! - Issuer classification (type, operating domains, assurance level)
//! - Issuer and agent records as stored by the trust index
//! - Query filters for listing records

pub mod agent;
pub mod query;
pub mod types;

pub use agent::{Agent, AgentRole};
pub use query::{AgentQuery, IssuerQuery};
pub use types::{normalize_name, validate_did, AssuranceLevel, Issuer, IssuerDomain, IssuerType};
