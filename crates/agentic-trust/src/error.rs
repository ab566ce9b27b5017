//! Error types for AgenticTrust.
//!
//! All errors are strongly typed and propagated without panicking.
//! Verification outcomes are *not* errors: the presentation verifier turns
//! every failure into a typed [`crate::presentation::Rejection`]. The
//! variants here describe failures of the machinery itself.

use crate::policy::CredentialType;

/// Trust engine error types covering all operations.
#[derive(Debug, thiserror::Error)]
pub enum TrustError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Policy table incomplete, missing: {0:?}")]
    IncompletePolicyTable(Vec<CredentialType>),

    #[error("Duplicate policy for credential type {0}")]
    DuplicatePolicy(CredentialType),

    #[error("Challenge store full ({0} pending challenges)")]
    ChallengeCapacity(usize),

    #[error("Invalid challenge parameters: {0}")]
    InvalidChallenge(String),

    #[error("Remote dependency {service} unavailable: {reason}")]
    Unavailable { service: String, reason: String },

    #[error("Remote call {operation} timed out after {millis}ms")]
    Timeout { operation: String, millis: u64 },

    #[error("Remote dependency {service} rejected request: {reason}")]
    Remote { service: String, reason: String },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrustError {
    /// Whether retrying the same call may succeed.
    ///
    /// Only failures of a remote dependency (connection refused, 5xx,
    /// timeout) are transient; a definitive answer from the dependency is not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }

    /// Whether this error means a dependency could not be reached.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. } | Self::Timeout { .. } | Self::Remote { .. }
        )
    }
}

impl From<serde_json::Error> for TrustError {
    fn from(e: serde_json::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, TrustError>;
