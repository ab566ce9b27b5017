//! The table mapping each credential type to its issuance policy.

use std::collections::BTreeMap;

use crate::error::{Result, TrustError};
use crate::issuer::{AssuranceLevel, IssuerDomain, IssuerType};

use super::types::{CredentialType, CredentialTypePolicy};

/// One policy per credential type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable {
    policies: BTreeMap<CredentialType, CredentialTypePolicy>,
}

impl PolicyTable {
    /// Build a table that must cover every credential type exactly once.
    pub fn from_policies(policies: impl IntoIterator<Item = CredentialTypePolicy>) -> Result<Self> {
        let table = Self::collect(policies)?;
        let missing = table.missing();
        if !missing.is_empty() {
            return Err(TrustError::IncompletePolicyTable(missing));
        }
        Ok(table)
    }

    /// Build a table that may leave credential types uncovered.
    ///
    /// Uncovered types assess as NO_POLICY_DEFINED.
    pub fn lenient(policies: impl IntoIterator<Item = CredentialTypePolicy>) -> Result<Self> {
        let table = Self::collect(policies)?;
        let missing = table.missing();
        if !missing.is_empty() {
            tracing::warn!(
                missing = ?missing,
                "policy table does not cover every credential type"
            );
        }
        Ok(table)
    }

    /// Parse a JSON array of policies.
    pub fn from_json(json: &str, lenient: bool) -> Result<Self> {
        let policies: Vec<CredentialTypePolicy> = serde_json::from_str(json)?;
        if lenient {
            Self::lenient(policies)
        } else {
            Self::from_policies(policies)
        }
    }

    /// Load a JSON policy file.
    pub fn load(path: &std::path::Path, lenient: bool) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json, lenient)
    }

    fn collect(policies: impl IntoIterator<Item = CredentialTypePolicy>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for policy in policies {
            let ct = policy.credential_type;
            if map.insert(ct, policy).is_some() {
                return Err(TrustError::DuplicatePolicy(ct));
            }
        }
        Ok(Self { policies: map })
    }

    /// Policy for a credential type.
    pub fn get(&self, credential_type: CredentialType) -> Option<&CredentialTypePolicy> {
        self.policies.get(&credential_type)
    }

    /// Policies in credential-type order.
    pub fn iter(&self) -> impl Iterator<Item = &CredentialTypePolicy> {
        self.policies.values()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Credential types with no policy.
    pub fn missing(&self) -> Vec<CredentialType> {
        CredentialType::ALL
            .into_iter()
            .filter(|ct| !self.policies.contains_key(ct))
            .collect()
    }

    /// The protocol's built-in policy table.
    pub fn builtin() -> Self {
        let policies = builtin_policies()
            .into_iter()
            .map(|p| (p.credential_type, p))
            .collect();
        Self { policies }
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_policies() -> Vec<CredentialTypePolicy> {
    use AssuranceLevel::*;
    use CredentialType as C;
    use IssuerDomain as D;
    use IssuerType::*;

    vec![
        // Identity & KYC
        CredentialTypePolicy::new(C::AgeOver18, [GovernmentEntity, Institution], BasicKyc)
            .described("Age verification requires government or institutional issuer"),
        CredentialTypePolicy::new(C::AgeOver21, [GovernmentEntity, Institution], BasicKyc)
            .described("Age verification requires government or institutional issuer"),
        CredentialTypePolicy::new(C::KycLevel1, [Corporation, GovernmentEntity], BasicKyc)
            .described("Basic KYC can be issued by verified corporations or government"),
        CredentialTypePolicy::new(C::KycLevel2, [Corporation, GovernmentEntity], RegulatedEntity)
            .described("Enhanced KYC requires regulated entity or government"),
        CredentialTypePolicy::new(C::IdentityVerified, [GovernmentEntity], SystemCritical)
            .requiring_domains([D::GovServices])
            .described("Identity verification must come from government entity"),
        // Government
        CredentialTypePolicy::new(C::VoterEligibility, [GovernmentEntity], SystemCritical)
            .requiring_domains([D::GovServices])
            .described("Voter eligibility must come from a government voting authority"),
        CredentialTypePolicy::new(C::Citizenship, [GovernmentEntity], SystemCritical)
            .requiring_domains([D::GovServices])
            .described("Citizenship must be issued by government"),
        CredentialTypePolicy::new(C::Residency, [GovernmentEntity], SystemCritical)
            .requiring_domains([D::GovServices])
            .described("Residency must be issued by government"),
        CredentialTypePolicy::new(C::DriversLicense, [GovernmentEntity], SystemCritical)
            .requiring_domains([D::GovServices])
            .described("Drivers license must be issued by DMV/government"),
        // Financial
        CredentialTypePolicy::new(C::FinancialAccount, [Corporation], RegulatedEntity)
            .requiring_domains([D::Financial])
            .described("Financial accounts must be from regulated financial institutions"),
        CredentialTypePolicy::new(C::CryptoExchangeKyc, [Corporation], RegulatedEntity)
            .requiring_domains([D::Financial])
            .described("Crypto exchange KYC must be from regulated exchange"),
        CredentialTypePolicy::new(
            C::AccreditedInvestor,
            [Corporation, GovernmentEntity],
            RegulatedEntity,
        )
        .requiring_domains([D::Financial])
        .described("Accredited investor status from financial institution or regulator"),
        // Healthcare
        CredentialTypePolicy::new(C::MedicalRecord, [Institution], RegulatedEntity)
            .requiring_domains([D::Medical])
            .described("Medical records must come from healthcare institutions"),
        CredentialTypePolicy::new(C::Prescription, [Institution], BasicKyc)
            .requiring_domains([D::Medical])
            .described("Prescriptions must be from licensed medical institutions"),
        CredentialTypePolicy::new(
            C::MedicalLicense,
            [GovernmentEntity, Institution],
            RegulatedEntity,
        )
        .requiring_domains([D::Medical, D::GovServices])
        .described("Medical licenses from government or medical boards"),
        CredentialTypePolicy::new(C::PatientConsent, [Institution], BasicKyc)
            .requiring_domains([D::Medical])
            .described("Patient consent from healthcare provider"),
        // Education & professional
        CredentialTypePolicy::new(C::Degree, [Institution], BasicKyc)
            .requiring_domains([D::Education])
            .described("Degrees must be from accredited educational institutions"),
        CredentialTypePolicy::new(
            C::ProfessionalLicense,
            [GovernmentEntity, Institution],
            RegulatedEntity,
        )
        .described("Professional licenses from licensing boards or government"),
        CredentialTypePolicy::new(C::Certification, [Corporation, Institution], BasicKyc)
            .described("Certifications from recognized institutions or corporations"),
        // Personal & social
        CredentialTypePolicy::new(
            C::UserPreference,
            [SelfSovereign, Corporation, Institution],
            Unverified,
        )
        .described("User preferences can be self-issued or from any trusted party"),
        CredentialTypePolicy::new(C::SocialAttestation, [SelfSovereign, Corporation], Unverified)
            .described("Social attestations can be from individuals or platforms"),
        CredentialTypePolicy::new(
            C::Reputation,
            [SelfSovereign, Corporation, Institution],
            Unverified,
        )
        .described("Reputation scores can be from various sources"),
        // Travel
        CredentialTypePolicy::new(
            C::TravelAuthorization,
            [Corporation, GovernmentEntity],
            BasicKyc,
        )
        .requiring_domains([D::Travel, D::GovServices])
        .described("Travel authorization from airlines or government"),
        CredentialTypePolicy::new(C::Visa, [GovernmentEntity], SystemCritical)
            .requiring_domains([D::GovServices])
            .described("Visas must be issued by government immigration authority"),
        // Commerce
        CredentialTypePolicy::new(C::MerchantVerification, [Corporation], BasicKyc)
            .requiring_domains([D::Commerce, D::Financial])
            .described("Merchant verification from payment processors or platforms"),
        CredentialTypePolicy::new(C::PurchaseAuthorization, [Corporation], BasicKyc)
            .requiring_domains([D::Commerce, D::Financial])
            .described("Purchase authorization from merchants or payment platforms"),
    ]
}
