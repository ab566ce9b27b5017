//! Exhaustive test: fraud policy invariants over the whole input space.
//!
//! Every credential type × issuer type × assurance level × domain set ×
//! brand claim × status flag combination is assessed against the built-in
//! table.

use std::collections::BTreeSet;

use agentic_trust::policy::{BrandRegistry, CredentialTypePolicy};
use agentic_trust::{
    AssuranceLevel, CredentialType, FraudPolicyEngine, Issuer, IssuerDomain, IssuerType,
    PolicyTable, Recommendation, RiskAssessment, RiskReason, RiskScore, TrustError,
};

const DOMAINS: [IssuerDomain; 7] = [
    IssuerDomain::Financial,
    IssuerDomain::Medical,
    IssuerDomain::Education,
    IssuerDomain::GovServices,
    IssuerDomain::Travel,
    IssuerDomain::Commerce,
    IssuerDomain::Social,
];

/// No claim, a well-known brand by alias, and an unknown brand.
const BRAND_CLAIMS: [Option<&str>; 3] = [None, Some("aws"), Some("Riverside Bakery")];

fn domain_sets() -> Vec<BTreeSet<IssuerDomain>> {
    let mut sets = vec![BTreeSet::new()];
    sets.extend(DOMAINS.iter().map(|d| BTreeSet::from([*d])));
    sets
}

/// Call `f` for every issuer in the search space.
fn for_each_issuer(mut f: impl FnMut(&Issuer)) {
    for issuer_type in IssuerType::ALL {
        for assurance in AssuranceLevel::ALL {
            for domains in domain_sets() {
                for brand in BRAND_CLAIMS {
                    for (revoked, active) in [(false, true), (false, false), (true, true)] {
                        let mut issuer = Issuer::new(
                            "did:agentic:subject",
                            issuer_type,
                            assurance,
                            "Subject Org",
                        );
                        issuer.domains = domains.clone();
                        issuer.claimed_brand_name = brand.map(str::to_string);
                        issuer.is_revoked = revoked;
                        issuer.is_active = active;
                        f(&issuer);
                    }
                }
            }
        }
    }
}

fn assess_all(mut check: impl FnMut(&Issuer, CredentialType, &RiskAssessment)) {
    let engine = FraudPolicyEngine::builtin();
    for_each_issuer(|issuer| {
        for credential_type in CredentialType::ALL {
            let a = engine.assess(issuer, credential_type);
            check(issuer, credential_type, &a);
        }
    });
}

#[test]
fn stress_builtin_table_is_complete() {
    let table = PolicyTable::builtin();
    assert_eq!(table.len(), CredentialType::ALL.len());
    assert!(table.missing().is_empty());
    for credential_type in CredentialType::ALL {
        let policy = table.get(credential_type).expect("every type has a policy");
        assert!(!policy.allowed_issuer_types.is_empty());
    }
}

#[test]
fn stress_incomplete_table_fails_fast() {
    let partial: Vec<CredentialTypePolicy> = PolicyTable::builtin()
        .iter()
        .filter(|p| p.credential_type != CredentialType::Visa)
        .cloned()
        .collect();

    match PolicyTable::from_policies(partial.clone()) {
        Err(TrustError::IncompletePolicyTable(missing)) => {
            assert_eq!(missing, vec![CredentialType::Visa]);
        }
        other => panic!("expected IncompletePolicyTable, got {other:?}"),
    }

    // Lenient tables load and the engine reports the gap instead.
    let engine = FraudPolicyEngine::new(
        PolicyTable::lenient(partial).unwrap(),
        BrandRegistry::builtin(),
    );
    let corp = Issuer::new(
        "did:agentic:travel",
        IssuerType::Corporation,
        AssuranceLevel::RegulatedEntity,
        "Travel Co",
    );
    let a = engine.assess(&corp, CredentialType::Visa);
    assert_eq!(a.reason, Some(RiskReason::NoPolicyDefined));
    assert_eq!(a.recommendation, Some(Recommendation::Warn));
}

#[test]
fn stress_self_sovereign_brand_claim_always_blocked() {
    let mut checked = 0usize;
    assess_all(|issuer, _, a| {
        if issuer.issuer_type == IssuerType::SelfSovereign
            && issuer.claimed_brand_name.as_deref() == Some("aws")
        {
            assert_eq!(a.reason, Some(RiskReason::BrandImpersonation));
            assert_eq!(a.score, RiskScore::Critical);
            assert_eq!(a.recommendation, Some(Recommendation::Block));
            checked += 1;
        }
    });
    assert!(checked > 0);
}

#[test]
fn stress_critical_always_blocks() {
    assess_all(|issuer, credential_type, a| {
        if a.score == RiskScore::Critical {
            assert_eq!(
                a.recommendation,
                Some(Recommendation::Block),
                "{} / {credential_type}: {a:?}",
                issuer.issuer_type
            );
        }
        assert!(a.recommendation.is_some());
        assert!(a.reason.is_some());
    });
}

#[test]
fn stress_revoked_issuer_always_blocked() {
    assess_all(|issuer, _, a| {
        if issuer.is_revoked {
            assert_eq!(a.score, RiskScore::Critical);
            assert_eq!(a.recommendation, Some(Recommendation::Block));
            assert!(a.is_blocking());
        }
    });
}

#[test]
fn stress_allow_implies_policy_admits() {
    let table = PolicyTable::builtin();
    assess_all(|issuer, credential_type, a| {
        if a.recommendation == Some(Recommendation::Allow) {
            let policy = table.get(credential_type).expect("policy");
            assert!(policy.admits(issuer), "{credential_type} allowed {issuer:?}");
            assert!(!issuer.is_revoked);
            assert!(issuer.is_active);
        }
    });
}

#[test]
fn stress_admitted_issuer_always_allowed() {
    let engine = FraudPolicyEngine::builtin();
    let table = PolicyTable::builtin();
    let (mut admitted, mut refused) = (0usize, 0usize);

    for credential_type in CredentialType::ALL {
        let policy = table.get(credential_type).expect("policy");
        for issuer_type in IssuerType::ALL {
            for assurance in AssuranceLevel::ALL {
                for domains in domain_sets() {
                    let mut issuer = Issuer::new(
                        "did:agentic:subject",
                        issuer_type,
                        assurance,
                        "Subject Org",
                    );
                    issuer.domains = domains;

                    let a = engine.assess(&issuer, credential_type);
                    if policy.admits(&issuer) {
                        assert_eq!(a.score, RiskScore::Low, "{credential_type} {issuer:?}: {a:?}");
                        assert_eq!(a.recommendation, Some(Recommendation::Allow));
                        assert_eq!(a.reason, Some(RiskReason::AllChecksPassed));
                        admitted += 1;
                    } else {
                        assert_ne!(a.recommendation, Some(Recommendation::Allow));
                        refused += 1;
                    }
                }
            }
        }
    }
    assert!(admitted > 0 && refused > 0);
}

#[test]
fn stress_assessment_is_deterministic() {
    let engine = FraudPolicyEngine::builtin();
    for_each_issuer(|issuer| {
        for credential_type in [
            CredentialType::MedicalRecord,
            CredentialType::Citizenship,
            CredentialType::KycLevel2,
        ] {
            assert_eq!(
                engine.assess(issuer, credential_type),
                engine.assess(issuer, credential_type)
            );
        }
    });
}
