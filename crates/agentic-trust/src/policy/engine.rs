//! Fraud policy engine: brand impersonation, eligibility, assurance and status checks.

use crate::issuer::{Issuer, IssuerType};

use super::brands::BrandRegistry;
use super::table::PolicyTable;
use super::types::*;

/// Deterministic issuer risk assessment. Holds no mutable state.
#[derive(Debug, Clone, Default)]
pub struct FraudPolicyEngine {
    policies: PolicyTable,
    brands: BrandRegistry,
}

impl FraudPolicyEngine {
    pub fn new(policies: PolicyTable, brands: BrandRegistry) -> Self {
        Self { policies, brands }
    }

    /// Engine over the built-in policy and brand tables.
    pub fn builtin() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    /// Policy for a credential type.
    pub fn policy(&self, credential_type: CredentialType) -> Option<&CredentialTypePolicy> {
        self.policies.get(credential_type)
    }

    pub fn well_known_brands(&self) -> &[WellKnownBrand] {
        self.brands.brands()
    }

    /// The well-known brand a claimed name refers to, if any.
    pub fn match_brand(&self, claimed: &str) -> Option<&WellKnownBrand> {
        self.brands.find(claimed)
    }

    /// Whether `issuer_type` may issue `credential_type` at all.
    pub fn is_type_allowed(&self, credential_type: CredentialType, issuer_type: IssuerType) -> bool {
        self.policies
            .get(credential_type)
            .is_some_and(|p| p.allows_type(issuer_type))
    }

    // -----------------------------------------------------------------------
    // Assessment
    // -----------------------------------------------------------------------

    /// Run every check and return the most severe finding.
    ///
    /// Stops at the first CRITICAL finding. Revocation is checked last and
    /// escalates whatever primary reason was already found.
    pub fn assess(&self, issuer: &Issuer, credential_type: CredentialType) -> RiskAssessment {
        let mut worst: Option<RiskAssessment> = None;

        let brand = self.check_brand(issuer);
        if brand.score == RiskScore::Critical {
            return self.apply_revocation(issuer, Some(brand));
        }
        keep_worst(&mut worst, brand);

        match self.policies.get(credential_type) {
            None => {
                tracing::warn!(
                    credential_type = %credential_type,
                    "no policy defined for credential type"
                );
                keep_worst(
                    &mut worst,
                    RiskAssessment::finding(
                        RiskScore::Medium,
                        RiskReason::NoPolicyDefined,
                        Recommendation::Warn,
                    )
                    .flag(format!("No policy defined for {credential_type}")),
                );
            }
            Some(policy) => {
                let eligibility = check_eligibility(issuer, policy);
                if eligibility.score == RiskScore::Critical {
                    return self.apply_revocation(issuer, Some(eligibility));
                }
                keep_worst(&mut worst, eligibility);
                keep_worst(&mut worst, check_assurance(issuer, policy));
            }
        }

        if issuer.is_revoked {
            return self.apply_revocation(issuer, worst);
        }
        if !issuer.is_active {
            keep_worst(
                &mut worst,
                RiskAssessment::finding(
                    RiskScore::High,
                    RiskReason::IssuerInactive,
                    Recommendation::Warn,
                )
                .flag("Issuer is not active"),
            );
        }

        worst.unwrap_or_else(|| {
            RiskAssessment::finding(
                RiskScore::Low,
                RiskReason::AllChecksPassed,
                Recommendation::Allow,
            )
        })
    }

    fn check_brand(&self, issuer: &Issuer) -> RiskAssessment {
        let Some(claimed) = issuer.claimed_brand_name.as_deref() else {
            return RiskAssessment::low();
        };
        let Some(brand) = self.brands.find(claimed) else {
            return RiskAssessment::low();
        };

        if issuer.issuer_type == IssuerType::SelfSovereign {
            tracing::warn!(
                did = %issuer.did,
                claimed_brand = %claimed,
                matched_brand = %brand.brand_name,
                "brand impersonation: self-sovereign issuer claims well-known brand"
            );
            return RiskAssessment::finding(
                RiskScore::Critical,
                RiskReason::BrandImpersonation,
                Recommendation::Block,
            )
            .flag(format!("Self-sovereign issuer claiming to be \"{claimed}\""))
            .flag(format!(
                "Real {} should be {} with {} assurance",
                brand.brand_name, brand.min_type, brand.min_assurance
            ));
        }

        if issuer.issuer_type != brand.min_type && issuer.issuer_type != IssuerType::GovernmentEntity {
            return RiskAssessment::finding(
                RiskScore::High,
                RiskReason::InsufficientCategory,
                Recommendation::Warn,
            )
            .flag(format!(
                "Brand \"{claimed}\" requires {}",
                brand.min_type
            ))
            .flag(format!("Issuer is only {}", issuer.issuer_type));
        }

        if issuer.assurance < brand.min_assurance {
            return RiskAssessment::finding(
                RiskScore::High,
                RiskReason::InsufficientBrandAssurance,
                Recommendation::Warn,
            )
            .flag(format!(
                "Brand \"{claimed}\" requires {}",
                brand.min_assurance
            ))
            .flag(format!("Issuer only has {}", issuer.assurance));
        }

        RiskAssessment::low().with_reason(RiskReason::VerifiedBrand)
    }

    /// Escalate (or produce) the revocation finding.
    fn apply_revocation(&self, issuer: &Issuer, primary: Option<RiskAssessment>) -> RiskAssessment {
        if !issuer.is_revoked {
            return primary.unwrap_or_else(RiskAssessment::low);
        }
        tracing::warn!(did = %issuer.did, "assessment of revoked issuer");
        match primary {
            Some(mut earlier) if earlier.is_blocking() => {
                earlier.score = RiskScore::Critical;
                earlier.recommendation = Some(Recommendation::Block);
                earlier.flags.push(REVOKED_FLAG.to_string());
                earlier
            }
            _ => RiskAssessment::finding(
                RiskScore::Critical,
                RiskReason::IssuerRevoked,
                Recommendation::Block,
            )
            .flag(REVOKED_FLAG),
        }
    }
}

const REVOKED_FLAG: &str = "Issuer has been revoked";

fn check_eligibility(issuer: &Issuer, policy: &CredentialTypePolicy) -> RiskAssessment {
    if !policy.allows_type(issuer.issuer_type) {
        tracing::warn!(
            did = %issuer.did,
            credential_type = %policy.credential_type,
            issuer_type = %issuer.issuer_type,
            "issuer type not allowed for credential type"
        );
        let allowed: Vec<&str> = policy.allowed_issuer_types.iter().map(|t| t.as_str()).collect();
        return RiskAssessment::finding(
            RiskScore::Critical,
            RiskReason::CategoryNotAllowed,
            Recommendation::Block,
        )
        .flag(format!(
            "{} requires issuer type: {}",
            policy.credential_type,
            allowed.join(" or ")
        ))
        .flag(format!("Issuer is {}", issuer.issuer_type));
    }

    if !policy.domains_satisfied(&issuer.domains) {
        let required: Vec<&str> = policy
            .required_domains
            .iter()
            .flatten()
            .map(|d| d.as_str())
            .collect();
        let held: Vec<&str> = issuer.domains.iter().map(|d| d.as_str()).collect();
        tracing::warn!(
            did = %issuer.did,
            credential_type = %policy.credential_type,
            "issuer holds none of the required domains"
        );
        return RiskAssessment::finding(
            RiskScore::Critical,
            RiskReason::DomainNotAllowed,
            Recommendation::Block,
        )
        .flag(format!(
            "{} requires domain: {}",
            policy.credential_type,
            required.join(" or ")
        ))
        .flag(format!("Issuer domains: [{}]", held.join(", ")));
    }

    RiskAssessment::low()
}

fn check_assurance(issuer: &Issuer, policy: &CredentialTypePolicy) -> RiskAssessment {
    if issuer.assurance < policy.min_assurance {
        return RiskAssessment::finding(
            RiskScore::High,
            RiskReason::InsufficientVerification,
            Recommendation::Block,
        )
        .flag(format!(
            "{} requires {}",
            policy.credential_type, policy.min_assurance
        ))
        .flag(format!("Issuer only has {}", issuer.assurance));
    }
    RiskAssessment::low()
}

/// Keep the more severe of the current worst finding and `candidate`.
///
/// LOW findings are ignored; ties keep the earlier finding.
fn keep_worst(worst: &mut Option<RiskAssessment>, candidate: RiskAssessment) {
    if candidate.score == RiskScore::Low {
        return;
    }
    let replace = worst
        .as_ref()
        .map_or(true, |current| candidate.severity() > current.severity());
    if replace {
        *worst = Some(candidate);
    }
}
