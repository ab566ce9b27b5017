//! AgenticTrust: credential trust-policy engine for AI agents.
//!
//! Decides whether a presentation from an agent should be trusted:
//! an issuer index with tiered caching, a fraud policy engine that detects
//! brand impersonation and enforces issuer eligibility per credential type,
//! single-use challenges for replay prevention, and a verifier that ties
//! them into one typed verdict.

pub mod challenge;
pub mod crypto;
pub mod error;
pub mod gateway;
pub mod index;
pub mod issuer;
pub mod policy;
pub mod presentation;
pub mod receipt;
pub mod storage;
pub mod time;

// Re-export primary types
pub use error::{Result, TrustError};
pub use issuer::{Agent, AgentRole, AssuranceLevel, Issuer, IssuerDomain, IssuerType};
pub use policy::{
    CredentialType, FraudPolicyEngine, PolicyTable, Recommendation, RiskAssessment, RiskReason,
    RiskScore,
};

// Re-export index and verification types
pub use challenge::{Challenge, ChallengeConfig, ChallengeError, ChallengeStore};
pub use gateway::{RetryGateway, RetryPolicy};
pub use index::{IndexConfig, RegistrySource, StaticRegistry, TrustIndex};
pub use presentation::{
    CredentialVerificationRequest, ErrorCode, Presentation, PresentationVerifier, Rejection,
    VerificationResult, VerificationState, VerifierConfig,
};
pub use receipt::{CredentialRecord, InMemoryReceiptRegistry, ReceiptStatus, ReceiptStatusProvider};
