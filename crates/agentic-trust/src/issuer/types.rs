//! Issuer records and their classification axes.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrustError};

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Legal/accountability form of an issuer. Immutable once registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssuerType {
    /// Individual or personal DID.
    SelfSovereign,
    /// Verified business or brand.
    Corporation,
    /// Official government issuer (DMV, passport office, voting authority).
    GovernmentEntity,
    /// Universities, hospitals, clinics, research institutes.
    Institution,
}

impl IssuerType {
    pub const ALL: [IssuerType; 4] = [
        Self::SelfSovereign,
        Self::Corporation,
        Self::GovernmentEntity,
        Self::Institution,
    ];

    /// Return a stable string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelfSovereign => "SELF_SOVEREIGN",
            Self::Corporation => "CORPORATION",
            Self::GovernmentEntity => "GOVERNMENT_ENTITY",
            Self::Institution => "INSTITUTION",
        }
    }
}

impl std::fmt::Display for IssuerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for IssuerType {
    type Err = TrustError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TrustError::InvalidRecord(format!("unknown issuer type: {s}")))
    }
}

/// Sector an issuer operates in. An issuer may hold several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssuerDomain {
    Financial,
    Medical,
    Education,
    GovServices,
    Travel,
    Commerce,
    Social,
}

impl IssuerDomain {
    /// Return a stable string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Financial => "FINANCIAL",
            Self::Medical => "MEDICAL",
            Self::Education => "EDUCATION",
            Self::GovServices => "GOV_SERVICES",
            Self::Travel => "TRAVEL",
            Self::Commerce => "COMMERCE",
            Self::Social => "SOCIAL",
        }
    }
}

impl std::fmt::Display for IssuerDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Strength of identity verification behind an issuer.
///
/// Variants are declared in ascending order; the derived `Ord` is the total
/// order used for every threshold comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssuranceLevel {
    /// No formal verification (self-registered).
    Unverified,
    /// Basic identity verification completed.
    BasicKyc,
    /// Fully regulated entity (banking, finance, healthcare).
    RegulatedEntity,
    /// Government or critical infrastructure.
    SystemCritical,
}

impl AssuranceLevel {
    pub const ALL: [AssuranceLevel; 4] = [
        Self::Unverified,
        Self::BasicKyc,
        Self::RegulatedEntity,
        Self::SystemCritical,
    ];

    /// Return a stable string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unverified => "UNVERIFIED",
            Self::BasicKyc => "BASIC_KYC",
            Self::RegulatedEntity => "REGULATED_ENTITY",
            Self::SystemCritical => "SYSTEM_CRITICAL",
        }
    }
}

impl std::fmt::Display for AssuranceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Issuer
// ---------------------------------------------------------------------------

/// A registered credential issuer.
///
/// `did` is the primary key and is never reused. Once `is_revoked` is set the
/// issuer is permanently ineligible, whatever the other fields say.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issuer {
    pub did: String,
    pub issuer_type: IssuerType,
    #[serde(default)]
    pub domains: BTreeSet<IssuerDomain>,
    pub assurance: AssuranceLevel,
    pub legal_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_brand_name: Option<String>,
    /// e.g. "US-DE", "EU".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
    /// DID of the entity that onboarded this issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_by: Option<String>,
    #[serde(default)]
    pub is_revoked: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl Issuer {
    /// Create an active, unrevoked issuer with no domains or brand claim.
    pub fn new(
        did: impl Into<String>,
        issuer_type: IssuerType,
        assurance: AssuranceLevel,
        legal_name: impl Into<String>,
    ) -> Self {
        Self {
            did: did.into(),
            issuer_type,
            domains: BTreeSet::new(),
            assurance,
            legal_name: legal_name.into(),
            claimed_brand_name: None,
            jurisdiction: None,
            registered_by: None,
            is_revoked: false,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// Add an operating domain.
    pub fn with_domain(mut self, domain: IssuerDomain) -> Self {
        self.domains.insert(domain);
        self
    }

    /// Set the claimed brand name.
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.claimed_brand_name = Some(brand.into());
        self
    }

    /// Set the jurisdiction.
    pub fn with_jurisdiction(mut self, jurisdiction: impl Into<String>) -> Self {
        self.jurisdiction = Some(jurisdiction.into());
        self
    }

    /// Mark the issuer revoked.
    pub fn revoked(mut self) -> Self {
        self.is_revoked = true;
        self
    }

    /// Mark the issuer inactive (suspended but not revoked).
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Normalized brand claim, if one is set and non-blank.
    pub fn normalized_brand(&self) -> Option<String> {
        self.claimed_brand_name
            .as_deref()
            .map(normalize_name)
            .filter(|b| !b.is_empty())
    }

    /// Check the record is well formed before it enters the index.
    pub fn validate(&self) -> Result<()> {
        validate_did(&self.did)?;
        if self.legal_name.trim().is_empty() {
            return Err(TrustError::InvalidRecord(format!(
                "issuer {} has an empty legal name",
                self.did
            )));
        }
        Ok(())
    }
}

/// Lowercase and trim a brand or alias for matching.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A DID must be non-empty and use the `did:` scheme.
pub fn validate_did(did: &str) -> Result<()> {
    if did.trim().is_empty() {
        return Err(TrustError::InvalidRecord("empty DID".into()));
    }
    if !did.starts_with("did:") {
        return Err(TrustError::InvalidRecord(format!(
            "DID must start with 'did:': {did}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assurance_total_order() {
        assert!(AssuranceLevel::Unverified < AssuranceLevel::BasicKyc);
        assert!(AssuranceLevel::BasicKyc < AssuranceLevel::RegulatedEntity);
        assert!(AssuranceLevel::RegulatedEntity < AssuranceLevel::SystemCritical);
        assert_eq!(
            AssuranceLevel::ALL.iter().max(),
            Some(&AssuranceLevel::SystemCritical)
        );
    }

    #[test]
    fn test_issuer_serde_wire_format() {
        let issuer = Issuer::new(
            "did:agentic:stanford_hospital",
            IssuerType::Institution,
            AssuranceLevel::RegulatedEntity,
            "Stanford Health Care",
        )
        .with_domain(IssuerDomain::Medical);

        let json = serde_json::to_value(&issuer).unwrap();
        assert_eq!(json["issuerType"], "INSTITUTION");
        assert_eq!(json["assurance"], "REGULATED_ENTITY");
        assert_eq!(json["domains"][0], "MEDICAL");
        assert_eq!(json["isRevoked"], false);
        assert!(json.get("claimedBrandName").is_none());

        let back: Issuer = serde_json::from_value(json).unwrap();
        assert_eq!(back, issuer);
    }

    #[test]
    fn test_issuer_defaults_when_fields_missing() {
        let json = r#"{
            "did": "did:agentic:x",
            "issuerType": "CORPORATION",
            "assurance": "BASIC_KYC",
            "legalName": "X Corp",
            "createdAt": "2025-11-14T12:00:00Z"
        }"#;
        let issuer: Issuer = serde_json::from_str(json).unwrap();
        assert!(issuer.is_active);
        assert!(!issuer.is_revoked);
        assert!(issuer.domains.is_empty());
    }

    #[test]
    fn test_validate() {
        let ok = Issuer::new("did:a:b", IssuerType::Corporation, AssuranceLevel::BasicKyc, "B");
        assert!(ok.validate().is_ok());

        let bad_did = Issuer::new("a:b", IssuerType::Corporation, AssuranceLevel::BasicKyc, "B");
        assert!(bad_did.validate().is_err());

        let no_name = Issuer::new("did:a:b", IssuerType::Corporation, AssuranceLevel::BasicKyc, " ");
        assert!(no_name.validate().is_err());
    }

    #[test]
    fn test_normalized_brand() {
        let issuer = Issuer::new("did:a:b", IssuerType::Corporation, AssuranceLevel::BasicKyc, "B")
            .with_brand("  Amazon Web Services ");
        assert_eq!(issuer.normalized_brand().as_deref(), Some("amazon web services"));

        let blank = issuer.clone().with_brand("   ");
        assert_eq!(blank.normalized_brand(), None);
    }

    #[test]
    fn test_issuer_type_from_str() {
        assert_eq!(
            "government_entity".parse::<IssuerType>().unwrap(),
            IssuerType::GovernmentEntity
        );
        assert!("PERSON".parse::<IssuerType>().is_err());
    }
}
