//! Integration test: end-to-end credential verification.
//!
//! Wires a synced TrustIndex, a ChallengeStore, the built-in policy engine
//! and an in-memory receipt registry into a PresentationVerifier, then walks
//! the acceptance scenarios through the public API:
//! A. self-sovereign issuer claiming a well-known brand is blocked
//! B. regulated medical institution is allowed
//! C. the same institution, revoked, is blocked
//! D. a replayed nonce is rejected even when everything else is valid
//! E. a corporation below the required assurance is blocked

use std::sync::Arc;

use agentic_trust::index::TRUSTED_ISSUER_0_DID;
use agentic_trust::presentation::{Disclosure, ReceiptRef};
use agentic_trust::time::ManualClock;
use agentic_trust::{
    AssuranceLevel, ChallengeConfig, ChallengeError, ChallengeStore, CredentialRecord,
    CredentialType, CredentialVerificationRequest, ErrorCode, FraudPolicyEngine,
    InMemoryReceiptRegistry, Issuer, IssuerDomain, IssuerType, Presentation,
    PresentationVerifier, Recommendation, RetryGateway, RetryPolicy, RiskReason, RiskScore,
    StaticRegistry, TrustIndex, VerificationState,
};

const CLINIC: &str = "did:agentic:clinic";

fn clinic() -> Issuer {
    Issuer::new(
        CLINIC,
        IssuerType::Institution,
        AssuranceLevel::RegulatedEntity,
        "Riverside Clinic",
    )
    .with_domain(IssuerDomain::Medical)
}

struct Deployment {
    verifier: PresentationVerifier,
    index: Arc<TrustIndex>,
    challenges: Arc<ChallengeStore>,
    receipts: Arc<InMemoryReceiptRegistry>,
}

/// A verifier whose registry knows the bootstrap records plus the clinic.
async fn deployment() -> Deployment {
    let registry = StaticRegistry::bootstrap().with_issuer(clinic());
    let index = Arc::new(
        TrustIndex::in_memory(Arc::new(registry))
            .with_gateway(RetryGateway::new(RetryPolicy::no_retry())),
    );
    index
        .sync_from_registry()
        .await
        .expect("sync should succeed")
        .expect("first sync should run");

    let challenges = Arc::new(ChallengeStore::default());
    let receipts = Arc::new(InMemoryReceiptRegistry::new());
    receipts.register(
        CredentialRecord::new("cred-1", CLINIC, CredentialType::MedicalRecord, "patient")
            .with_scope("records:read")
            .with_scope("appointments:book"),
    );

    let verifier = PresentationVerifier::new(
        index.clone(),
        challenges.clone(),
        Arc::new(FraudPolicyEngine::builtin()),
        receipts.clone(),
    )
    .with_gateway(RetryGateway::new(RetryPolicy::no_retry()));

    Deployment {
        verifier,
        index,
        challenges,
        receipts,
    }
}

fn presentation(nonce: &str) -> Presentation {
    Presentation {
        subject_id: "did:agentic:comet".into(),
        nonce: nonce.into(),
        proof: "zk-proof".into(),
        disclosed: Disclosure {
            role: "patient".into(),
            scopes: vec!["records:read".into()],
        },
        receipt: ReceiptRef {
            credential_hash: "cred-1".into(),
            issuer_did: CLINIC.into(),
            credential_type: CredentialType::MedicalRecord,
            attestation: "attestation".into(),
        },
    }
}

// ── Policy scenarios ─────────────────────────────────────────────────────────

#[test]
fn scenario_a_brand_impersonation_blocked_for_every_type() {
    let engine = FraudPolicyEngine::builtin();
    let impostor = Issuer::new(
        "did:key:z6Mkimpostor",
        IssuerType::SelfSovereign,
        AssuranceLevel::Unverified,
        "Amazon Rewards",
    )
    .with_brand("Amazon");

    for credential_type in CredentialType::ALL {
        let a = engine.assess(&impostor, credential_type);
        assert_eq!(a.recommendation, Some(Recommendation::Block));
        assert_eq!(a.reason, Some(RiskReason::BrandImpersonation));
        assert_eq!(a.score, RiskScore::Critical);
    }
}

#[test]
fn scenario_b_regulated_institution_allowed() {
    let a = FraudPolicyEngine::builtin().assess(&clinic(), CredentialType::MedicalRecord);
    assert_eq!(a.recommendation, Some(Recommendation::Allow));
    assert_eq!(a.score, RiskScore::Low);
}

#[test]
fn scenario_c_revoked_institution_blocked() {
    let a = FraudPolicyEngine::builtin().assess(&clinic().revoked(), CredentialType::MedicalRecord);
    assert_eq!(a.recommendation, Some(Recommendation::Block));
    assert_eq!(a.reason, Some(RiskReason::IssuerRevoked));
    assert_eq!(a.score, RiskScore::Critical);
}

#[test]
fn scenario_e_insufficient_assurance_blocked() {
    let exchange = Issuer::new(
        "did:agentic:small_exchange",
        IssuerType::Corporation,
        AssuranceLevel::BasicKyc,
        "Small Exchange LLC",
    )
    .with_domain(IssuerDomain::Financial);

    let a = FraudPolicyEngine::builtin().assess(&exchange, CredentialType::CryptoExchangeKyc);
    assert_eq!(a.recommendation, Some(Recommendation::Block));
    assert_eq!(a.reason, Some(RiskReason::InsufficientVerification));
}

// ── Presentation flow ────────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_b_presentation_accepted() {
    let d = deployment().await;
    let challenge = d.challenges.issue_default("pharmacy").unwrap();

    let verified = d
        .verifier
        .verify(&presentation(&challenge.nonce))
        .await
        .into_result()
        .expect("presentation should verify");

    assert_eq!(verified.subject_id, "did:agentic:comet");
    assert_eq!(verified.role, "patient");
    assert_eq!(verified.scopes, vec!["records:read".to_string()]);
    assert_eq!(verified.issuer_did, CLINIC);
    assert_eq!(verified.credential_type, CredentialType::MedicalRecord);
    assert_eq!(d.challenges.pending(), 0);
}

#[tokio::test]
async fn scenario_c_presentation_from_revoked_issuer_rejected() {
    let d = deployment().await;
    d.index.upsert(clinic().revoked()).unwrap();
    let challenge = d.challenges.issue_default("pharmacy").unwrap();

    let result = d.verifier.verify(&presentation(&challenge.nonce)).await;
    let rejection = result.rejection().expect("revoked issuer must be rejected");
    assert_eq!(rejection.error_code, ErrorCode::IssuerRevoked);
    assert_eq!(rejection.state, VerificationState::IssuerResolved);
    assert!(!rejection.flags.is_empty());
}

#[tokio::test]
async fn scenario_d_replayed_nonce_rejected() {
    let d = deployment().await;
    let challenge = d.challenges.issue_default("pharmacy").unwrap();
    let p = presentation(&challenge.nonce);

    assert!(d.verifier.verify(&p).await.is_valid());

    let replay = d.verifier.verify(&p).await;
    assert_eq!(replay.error_code(), Some(ErrorCode::InvalidChallenge));
}

#[tokio::test]
async fn revoked_receipt_rejected_after_first_use() {
    let d = deployment().await;

    let first = d.challenges.issue_default("pharmacy").unwrap();
    assert!(d.verifier.verify(&presentation(&first.nonce)).await.is_valid());

    assert!(d.receipts.revoke("cred-1"));
    let second = d.challenges.issue_default("pharmacy").unwrap();
    let result = d.verifier.verify(&presentation(&second.nonce)).await;
    assert_eq!(result.error_code(), Some(ErrorCode::CredentialRevoked));
}

#[tokio::test]
async fn expired_challenge_rejected() {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let store = ChallengeStore::new(ChallengeConfig::default()).with_clock(clock.clone());

    let challenge = store.issue("pharmacy", 30).unwrap();
    clock.advance_secs(31);
    assert_eq!(store.consume(&challenge.nonce), Err(ChallengeError::Expired));

    // Expired entries are removed on access.
    assert_eq!(store.consume(&challenge.nonce), Err(ChallengeError::NotFound));
}

#[tokio::test]
async fn bootstrap_issuer_verifies_kyc_credential() {
    let d = deployment().await;
    let challenge = d.challenges.issue_default("exchange").unwrap();

    let request = CredentialVerificationRequest {
        credential_type: CredentialType::KycLevel1,
        issuer_did: TRUSTED_ISSUER_0_DID.into(),
        proof: "zk-proof".into(),
        challenge: challenge.nonce,
    };
    let verified = d
        .verifier
        .verify_credential(&request)
        .await
        .into_result()
        .expect("trusted issuer 0 should verify KYC");
    assert_eq!(verified.issuer_type, IssuerType::Corporation);
    assert!(verified.domains.contains(&IssuerDomain::Financial));
}
