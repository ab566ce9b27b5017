//! Receipt status: whether an individual credential is still good.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::policy::CredentialType;

/// What was recorded when a credential was issued.
///
/// The issuer and credential type are part of the attested record; a
/// presentation naming anything else for the same hash is not this credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    pub credential_hash: String,
    pub issuer_did: String,
    pub credential_type: CredentialType,
    pub role: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Unix seconds; none means the credential does not expire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

impl CredentialRecord {
    pub fn new(
        credential_hash: impl Into<String>,
        issuer_did: impl Into<String>,
        credential_type: CredentialType,
        role: impl Into<String>,
    ) -> Self {
        Self {
            credential_hash: credential_hash.into(),
            issuer_did: issuer_did.into(),
            credential_type,
            role: role.into(),
            scopes: Vec::new(),
            expires_at: None,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
        self
    }

    pub fn expiring_at(mut self, unix_secs: u64) -> Self {
        self.expires_at = Some(unix_secs);
        self
    }

    /// The record was issued by `issuer_did` for `credential_type`.
    pub fn issued_as(&self, issuer_did: &str, credential_type: CredentialType) -> bool {
        self.issuer_did == issuer_did && self.credential_type == credential_type
    }

    /// Every scope in `requested` was recorded for this credential.
    pub fn covers_scopes<'a>(&self, requested: impl IntoIterator<Item = &'a String>) -> bool {
        requested.into_iter().all(|s| self.scopes.contains(s))
    }
}

/// Attestation state of a single credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "record", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceiptStatus {
    Valid(CredentialRecord),
    Revoked,
    Expired,
    Unknown,
}

impl ReceiptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid(_) => "VALID",
            Self::Revoked => "REVOKED",
            Self::Expired => "EXPIRED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Looks up the status of a credential by its hash.
///
/// An `Err` means the provider could not answer; a definite "no such
/// credential" is `Ok(ReceiptStatus::Unknown)`.
#[async_trait]
pub trait ReceiptStatusProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self, credential_hash: &str) -> Result<ReceiptStatus>;
}
