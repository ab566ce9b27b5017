//! Credential issuance policy and fraud detection.
//!
//! The policy module provides:
//! - The closed set of credential types and their issuance policies
//! - The well-known brand registry used for impersonation checks
//! - The fraud policy engine producing risk assessments

pub mod brands;
pub mod engine;
pub mod table;
pub mod types;

pub use brands::BrandRegistry;
pub use engine::FraudPolicyEngine;
pub use table::PolicyTable;
pub use types::{
    CredentialType, CredentialTypePolicy, Recommendation, RiskAssessment, RiskReason, RiskScore,
    WellKnownBrand,
};
