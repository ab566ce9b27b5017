//! Data structures for credential policies and risk assessments.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrustError};
use crate::issuer::{AssuranceLevel, Issuer, IssuerDomain, IssuerType};

// ---------------------------------------------------------------------------
// Credential type
// ---------------------------------------------------------------------------

/// Class of credential an issuer can attest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CredentialType {
    // Identity & KYC
    #[serde(rename = "AGE_OVER_18")]
    AgeOver18,
    #[serde(rename = "AGE_OVER_21")]
    AgeOver21,
    #[serde(rename = "KYC_LEVEL_1")]
    KycLevel1,
    #[serde(rename = "KYC_LEVEL_2")]
    KycLevel2,
    IdentityVerified,

    // Government
    VoterEligibility,
    Citizenship,
    Residency,
    DriversLicense,

    // Financial
    FinancialAccount,
    CryptoExchangeKyc,
    AccreditedInvestor,

    // Healthcare
    MedicalRecord,
    Prescription,
    MedicalLicense,
    PatientConsent,

    // Education & professional
    Degree,
    ProfessionalLicense,
    Certification,

    // Personal & social
    UserPreference,
    SocialAttestation,
    Reputation,

    // Travel
    TravelAuthorization,
    Visa,

    // Commerce
    MerchantVerification,
    PurchaseAuthorization,
}

impl CredentialType {
    /// Every credential type, in declaration order.
    pub const ALL: [CredentialType; 26] = [
        Self::AgeOver18,
        Self::AgeOver21,
        Self::KycLevel1,
        Self::KycLevel2,
        Self::IdentityVerified,
        Self::VoterEligibility,
        Self::Citizenship,
        Self::Residency,
        Self::DriversLicense,
        Self::FinancialAccount,
        Self::CryptoExchangeKyc,
        Self::AccreditedInvestor,
        Self::MedicalRecord,
        Self::Prescription,
        Self::MedicalLicense,
        Self::PatientConsent,
        Self::Degree,
        Self::ProfessionalLicense,
        Self::Certification,
        Self::UserPreference,
        Self::SocialAttestation,
        Self::Reputation,
        Self::TravelAuthorization,
        Self::Visa,
        Self::MerchantVerification,
        Self::PurchaseAuthorization,
    ];

    /// Return a stable string representation (the wire name).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AgeOver18 => "AGE_OVER_18",
            Self::AgeOver21 => "AGE_OVER_21",
            Self::KycLevel1 => "KYC_LEVEL_1",
            Self::KycLevel2 => "KYC_LEVEL_2",
            Self::IdentityVerified => "IDENTITY_VERIFIED",
            Self::VoterEligibility => "VOTER_ELIGIBILITY",
            Self::Citizenship => "CITIZENSHIP",
            Self::Residency => "RESIDENCY",
            Self::DriversLicense => "DRIVERS_LICENSE",
            Self::FinancialAccount => "FINANCIAL_ACCOUNT",
            Self::CryptoExchangeKyc => "CRYPTO_EXCHANGE_KYC",
            Self::AccreditedInvestor => "ACCREDITED_INVESTOR",
            Self::MedicalRecord => "MEDICAL_RECORD",
            Self::Prescription => "PRESCRIPTION",
            Self::MedicalLicense => "MEDICAL_LICENSE",
            Self::PatientConsent => "PATIENT_CONSENT",
            Self::Degree => "DEGREE",
            Self::ProfessionalLicense => "PROFESSIONAL_LICENSE",
            Self::Certification => "CERTIFICATION",
            Self::UserPreference => "USER_PREFERENCE",
            Self::SocialAttestation => "SOCIAL_ATTESTATION",
            Self::Reputation => "REPUTATION",
            Self::TravelAuthorization => "TRAVEL_AUTHORIZATION",
            Self::Visa => "VISA",
            Self::MerchantVerification => "MERCHANT_VERIFICATION",
            Self::PurchaseAuthorization => "PURCHASE_AUTHORIZATION",
        }
    }
}

impl std::fmt::Display for CredentialType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for CredentialType {
    type Err = TrustError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| TrustError::InvalidRecord(format!("unknown credential type: {s}")))
    }
}

// ---------------------------------------------------------------------------
// Policies and brands
// ---------------------------------------------------------------------------

/// Who may issue one credential type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialTypePolicy {
    pub credential_type: CredentialType,
    pub allowed_issuer_types: BTreeSet<IssuerType>,
    /// At least one of these domains must be held, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_domains: Option<BTreeSet<IssuerDomain>>,
    pub min_assurance: AssuranceLevel,
    #[serde(default)]
    pub description: String,
}

impl CredentialTypePolicy {
    pub fn new(
        credential_type: CredentialType,
        allowed: impl IntoIterator<Item = IssuerType>,
        min_assurance: AssuranceLevel,
    ) -> Self {
        Self {
            credential_type,
            allowed_issuer_types: allowed.into_iter().collect(),
            required_domains: None,
            min_assurance,
            description: String::new(),
        }
    }

    pub fn requiring_domains(mut self, domains: impl IntoIterator<Item = IssuerDomain>) -> Self {
        self.required_domains = Some(domains.into_iter().collect());
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn allows_type(&self, issuer_type: IssuerType) -> bool {
        self.allowed_issuer_types.contains(&issuer_type)
    }

    /// At-least-one domain semantics; no requirement is always satisfied.
    pub fn domains_satisfied(&self, domains: &BTreeSet<IssuerDomain>) -> bool {
        match &self.required_domains {
            Some(required) => !required.is_disjoint(domains),
            None => true,
        }
    }

    /// Type, domain and assurance all satisfied (status flags not considered).
    pub fn admits(&self, issuer: &Issuer) -> bool {
        self.allows_type(issuer.issuer_type)
            && self.domains_satisfied(&issuer.domains)
            && issuer.assurance >= self.min_assurance
    }
}

/// A name reserved for legally verified entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellKnownBrand {
    pub brand_name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub min_type: IssuerType,
    pub min_assurance: AssuranceLevel,
}

impl WellKnownBrand {
    pub fn new(
        brand_name: impl Into<String>,
        aliases: &[&str],
        min_type: IssuerType,
        min_assurance: AssuranceLevel,
    ) -> Self {
        Self {
            brand_name: brand_name.into(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            min_type,
            min_assurance,
        }
    }
}

// ---------------------------------------------------------------------------
// Risk assessment
// ---------------------------------------------------------------------------

/// Severity of a finding, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskScore {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskScore {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for RiskScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// What the relying party should do, in ascending order of severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Allow,
    Warn,
    Block,
}

/// Stable machine-readable reason attached to an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskReason {
    AllChecksPassed,
    VerifiedBrand,
    BrandImpersonation,
    InsufficientCategory,
    InsufficientBrandAssurance,
    NoPolicyDefined,
    CategoryNotAllowed,
    DomainNotAllowed,
    InsufficientVerification,
    IssuerRevoked,
    IssuerInactive,
}

impl RiskReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllChecksPassed => "ALL_CHECKS_PASSED",
            Self::VerifiedBrand => "VERIFIED_BRAND",
            Self::BrandImpersonation => "BRAND_IMPERSONATION",
            Self::InsufficientCategory => "INSUFFICIENT_CATEGORY",
            Self::InsufficientBrandAssurance => "INSUFFICIENT_BRAND_ASSURANCE",
            Self::NoPolicyDefined => "NO_POLICY_DEFINED",
            Self::CategoryNotAllowed => "CATEGORY_NOT_ALLOWED",
            Self::DomainNotAllowed => "DOMAIN_NOT_ALLOWED",
            Self::InsufficientVerification => "INSUFFICIENT_VERIFICATION",
            Self::IssuerRevoked => "ISSUER_REVOKED",
            Self::IssuerInactive => "ISSUER_INACTIVE",
        }
    }
}

impl std::fmt::Display for RiskReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Output of the fraud policy engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: RiskScore,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<RiskReason>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<Recommendation>,
}

impl RiskAssessment {
    /// A LOW finding with no recommendation.
    pub fn low() -> Self {
        Self {
            score: RiskScore::Low,
            reason: None,
            flags: Vec::new(),
            recommendation: None,
        }
    }

    /// A finding with a reason and recommendation.
    ///
    /// CRITICAL is forced to BLOCK whatever `recommendation` says.
    pub fn finding(score: RiskScore, reason: RiskReason, recommendation: Recommendation) -> Self {
        let recommendation = if score == RiskScore::Critical {
            Recommendation::Block
        } else {
            recommendation
        };
        Self {
            score,
            reason: Some(reason),
            flags: Vec::new(),
            recommendation: Some(recommendation),
        }
    }

    pub fn with_reason(mut self, reason: RiskReason) -> Self {
        self.reason = Some(reason);
        self
    }

    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    /// Whether the relying party must refuse the credential.
    pub fn is_blocking(&self) -> bool {
        self.score == RiskScore::Critical || self.recommendation == Some(Recommendation::Block)
    }

    /// Ordering key used to pick the most severe finding.
    pub(crate) fn severity(&self) -> (RiskScore, Recommendation) {
        (
            self.score,
            self.recommendation.unwrap_or(Recommendation::Allow),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&CredentialType::AgeOver18).unwrap(),
            "\"AGE_OVER_18\""
        );
        assert_eq!(
            serde_json::to_string(&CredentialType::KycLevel2).unwrap(),
            "\"KYC_LEVEL_2\""
        );
        assert_eq!(
            serde_json::to_string(&CredentialType::MedicalRecord).unwrap(),
            "\"MEDICAL_RECORD\""
        );
        for ct in CredentialType::ALL {
            let json = serde_json::to_string(&ct).unwrap();
            assert_eq!(json, format!("\"{}\"", ct.as_str()));
            assert_eq!(ct.as_str().parse::<CredentialType>().unwrap(), ct);
        }
    }

    #[test]
    fn test_critical_forces_block() {
        let a = RiskAssessment::finding(
            RiskScore::Critical,
            RiskReason::IssuerRevoked,
            Recommendation::Warn,
        );
        assert_eq!(a.recommendation, Some(Recommendation::Block));
        assert!(a.is_blocking());
    }

    #[test]
    fn test_domains_at_least_one() {
        let policy = CredentialTypePolicy::new(
            CredentialType::MerchantVerification,
            [IssuerType::Corporation],
            AssuranceLevel::BasicKyc,
        )
        .requiring_domains([IssuerDomain::Commerce, IssuerDomain::Financial]);

        let only_financial: BTreeSet<_> = [IssuerDomain::Financial].into();
        let medical: BTreeSet<_> = [IssuerDomain::Medical].into();
        assert!(policy.domains_satisfied(&only_financial));
        assert!(!policy.domains_satisfied(&medical));
        assert!(!policy.domains_satisfied(&BTreeSet::new()));
    }

    #[test]
    fn test_severity_ordering() {
        let warn = RiskAssessment::finding(
            RiskScore::High,
            RiskReason::InsufficientCategory,
            Recommendation::Warn,
        );
        let block = RiskAssessment::finding(
            RiskScore::High,
            RiskReason::InsufficientVerification,
            Recommendation::Block,
        );
        assert!(block.severity() > warn.severity());
    }
}
