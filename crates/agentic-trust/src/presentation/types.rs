//! Presentations, verification states and results.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize, Serializer};

use crate::issuer::{AssuranceLevel, IssuerDomain, IssuerType};
use crate::policy::{CredentialType, RiskReason, RiskScore};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// What the holder chose to reveal about its credential.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disclosure {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Reference to the attested credential behind a presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptRef {
    #[serde(default)]
    pub credential_hash: String,
    #[serde(default)]
    pub issuer_did: String,
    pub credential_type: CredentialType,
    /// Opaque attestation blob, checked by the proof system.
    #[serde(default)]
    pub attestation: String,
}

/// A presentation from an agent, bound to a challenge nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    #[serde(default)]
    pub subject_id: String,
    #[serde(default)]
    pub nonce: String,
    #[serde(default)]
    pub proof: String,
    #[serde(default)]
    pub disclosed: Disclosure,
    pub receipt: ReceiptRef,
}

/// Body of the credential-only verification request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialVerificationRequest {
    pub credential_type: CredentialType,
    #[serde(default)]
    pub issuer_did: String,
    #[serde(default)]
    pub proof: String,
    /// Nonce of a previously issued challenge.
    #[serde(default)]
    pub challenge: String,
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Progress of a verification, in the order the steps run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum VerificationState {
    Received = 0,
    StructureChecked = 1,
    ChallengeConsumed = 2,
    IssuerResolved = 3,
    RiskAssessed = 4,
    ReceiptChecked = 5,
    RoleMatched = 6,
    Valid = 7,
}

impl VerificationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "RECEIVED",
            Self::StructureChecked => "STRUCTURE_CHECKED",
            Self::ChallengeConsumed => "CHALLENGE_CONSUMED",
            Self::IssuerResolved => "ISSUER_RESOLVED",
            Self::RiskAssessed => "RISK_ASSESSED",
            Self::ReceiptChecked => "RECEIPT_CHECKED",
            Self::RoleMatched => "ROLE_MATCHED",
            Self::Valid => "VALID",
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Received,
            1 => Self::StructureChecked,
            2 => Self::ChallengeConsumed,
            3 => Self::IssuerResolved,
            4 => Self::RiskAssessed,
            5 => Self::ReceiptChecked,
            6 => Self::RoleMatched,
            _ => Self::Valid,
        }
    }
}

impl std::fmt::Display for VerificationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Stable machine code for a rejected verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidStructure,
    InvalidChallenge,
    UnknownIssuer,
    BrandImpersonation,
    CategoryNotAllowed,
    DomainNotAllowed,
    InsufficientVerification,
    IssuerRevoked,
    CredentialRevoked,
    CredentialExpired,
    UnknownCredential,
    RoleMismatch,
    ServiceUnavailable,
    InternalError,
    Cancelled,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidStructure => "INVALID_STRUCTURE",
            Self::InvalidChallenge => "INVALID_CHALLENGE",
            Self::UnknownIssuer => "UNKNOWN_ISSUER",
            Self::BrandImpersonation => "BRAND_IMPERSONATION",
            Self::CategoryNotAllowed => "CATEGORY_NOT_ALLOWED",
            Self::DomainNotAllowed => "DOMAIN_NOT_ALLOWED",
            Self::InsufficientVerification => "INSUFFICIENT_VERIFICATION",
            Self::IssuerRevoked => "ISSUER_REVOKED",
            Self::CredentialRevoked => "CREDENTIAL_REVOKED",
            Self::CredentialExpired => "CREDENTIAL_EXPIRED",
            Self::UnknownCredential => "UNKNOWN_CREDENTIAL",
            Self::RoleMismatch => "ROLE_MISMATCH",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::InternalError => "INTERNAL_ERROR",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// HTTP status a gateway should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidStructure => 400,
            Self::ServiceUnavailable => 503,
            Self::InternalError => 500,
            // Client closed request.
            Self::Cancelled => 499,
            _ => 403,
        }
    }

    /// Code reported when the risk engine blocks for `reason`.
    pub fn from_risk_reason(reason: RiskReason) -> Self {
        match reason {
            RiskReason::BrandImpersonation
            | RiskReason::InsufficientCategory
            | RiskReason::InsufficientBrandAssurance => Self::BrandImpersonation,
            RiskReason::CategoryNotAllowed | RiskReason::NoPolicyDefined => {
                Self::CategoryNotAllowed
            }
            RiskReason::DomainNotAllowed => Self::DomainNotAllowed,
            RiskReason::InsufficientVerification => Self::InsufficientVerification,
            RiskReason::IssuerRevoked | RiskReason::IssuerInactive => Self::IssuerRevoked,
            RiskReason::AllChecksPassed | RiskReason::VerifiedBrand => Self::InternalError,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Why a verification failed and how far it got.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    pub error_code: ErrorCode,
    pub reason: String,
    #[serde(default)]
    pub flags: Vec<String>,
    /// Last state reached before the failing step.
    pub state: VerificationState,
}

impl Rejection {
    pub fn new(error_code: ErrorCode, reason: impl Into<String>, state: VerificationState) -> Self {
        Self {
            error_code,
            reason: reason.into(),
            flags: Vec::new(),
            state,
        }
    }

    pub fn with_flags(mut self, flags: Vec<String>) -> Self {
        self.flags = flags;
        self
    }

    pub fn http_status(&self) -> u16 {
        self.error_code.http_status()
    }
}

/// A presentation that passed every check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedPresentation {
    pub subject_id: String,
    pub role: String,
    pub scopes: Vec<String>,
    pub risk_score: RiskScore,
    pub issuer_did: String,
    pub credential_type: CredentialType,
}

/// A credential whose issuer passed eligibility and risk checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedCredential {
    pub issuer_did: String,
    pub issuer_type: IssuerType,
    pub domains: BTreeSet<IssuerDomain>,
    pub assurance_level: AssuranceLevel,
    pub credential_type: CredentialType,
    pub risk_score: RiskScore,
    pub risk_flags: Vec<String>,
}

/// Outcome of a verification. Serializes flat with a `valid` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict<T> {
    Valid(T),
    Rejected(Rejection),
}

/// Outcome of the full presentation state machine.
pub type VerificationResult = Verdict<VerifiedPresentation>;

/// Outcome of a credential-only verification.
pub type CredentialVerification = Verdict<VerifiedCredential>;

impl<T> Verdict<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Valid(_) => None,
            Self::Rejected(r) => Some(r),
        }
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        self.rejection().map(|r| r.error_code)
    }

    pub fn into_result(self) -> std::result::Result<T, Rejection> {
        match self {
            Self::Valid(v) => Ok(v),
            Self::Rejected(r) => Err(r),
        }
    }
}

impl<T> From<std::result::Result<T, Rejection>> for Verdict<T> {
    fn from(result: std::result::Result<T, Rejection>) -> Self {
        match result {
            Ok(v) => Self::Valid(v),
            Err(r) => Self::Rejected(r),
        }
    }
}

#[derive(Serialize)]
struct Flagged<'a, T> {
    valid: bool,
    #[serde(flatten)]
    body: &'a T,
}

impl<T: Serialize> Serialize for Verdict<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Valid(v) => Flagged {
                valid: true,
                body: v,
            }
            .serialize(serializer),
            Self::Rejected(r) => Flagged {
                valid: false,
                body: r,
            }
            .serialize(serializer),
        }
    }
}
