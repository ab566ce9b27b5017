//! Concurrency test: single-use challenges under contention.
//!
//! However many tasks race for the same nonce, exactly one consume (and so
//! exactly one presentation) succeeds.

use std::collections::HashSet;
use std::sync::Arc;

use agentic_trust::presentation::{Disclosure, ReceiptRef};
use agentic_trust::{
    AssuranceLevel, ChallengeError, ChallengeStore, CredentialRecord, CredentialType, ErrorCode,
    FraudPolicyEngine, InMemoryReceiptRegistry, Issuer, IssuerDomain, IssuerType, Presentation,
    PresentationVerifier, RetryGateway, RetryPolicy, StaticRegistry, TrustIndex,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn stress_one_nonce_many_consumers() {
    let store = Arc::new(ChallengeStore::default());

    for _ in 0..50 {
        let challenge = store.issue_default("rp").unwrap();

        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = Arc::clone(&store);
            let nonce = challenge.nonce.clone();
            handles.push(tokio::spawn(async move { store.consume(&nonce) }));
        }

        let mut successes = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(c) => {
                    assert_eq!(c, challenge);
                    successes += 1;
                }
                Err(e) => assert_eq!(e, ChallengeError::NotFound),
            }
        }
        assert_eq!(successes, 1, "exactly one consumer must win");
    }
    assert_eq!(store.pending(), 0);
}

#[test]
fn stress_os_threads_consume_disjoint_nonces() {
    let store = Arc::new(ChallengeStore::default());
    let nonces: Vec<String> = (0..2_000)
        .map(|_| store.issue_default("rp").unwrap().nonce)
        .collect();

    let unique: HashSet<&String> = nonces.iter().collect();
    assert_eq!(unique.len(), nonces.len(), "nonces must not repeat");
    assert!(nonces.iter().all(|n| n.len() >= 32));

    let nonces = Arc::new(nonces);
    let mut handles = Vec::new();
    for t in 0..8 {
        let store = Arc::clone(&store);
        let nonces = Arc::clone(&nonces);
        handles.push(std::thread::spawn(move || {
            // Every thread tries every nonce, starting at a different offset.
            let mut won = 0usize;
            for i in 0..nonces.len() {
                let nonce = &nonces[(i + t * 250) % nonces.len()];
                if store.consume(nonce).is_ok() {
                    won += 1;
                }
            }
            won
        }));
    }

    let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(total, 2_000);
    assert_eq!(store.pending(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn stress_replayed_presentation_accepted_once() {
    let issuer = Issuer::new(
        "did:agentic:lab",
        IssuerType::Institution,
        AssuranceLevel::RegulatedEntity,
        "Northside Lab",
    )
    .with_domain(IssuerDomain::Medical);

    let index = Arc::new(
        TrustIndex::in_memory(Arc::new(StaticRegistry::default()))
            .with_gateway(RetryGateway::new(RetryPolicy::no_retry())),
    );
    index.upsert(issuer).unwrap();
    let challenges = Arc::new(ChallengeStore::default());
    let receipts = Arc::new(InMemoryReceiptRegistry::new());
    receipts.register(CredentialRecord::new(
        "lab-result-7",
        "did:agentic:lab",
        CredentialType::MedicalRecord,
        "patient",
    ));

    let verifier = Arc::new(
        PresentationVerifier::new(
            index,
            challenges.clone(),
            Arc::new(FraudPolicyEngine::builtin()),
            receipts,
        )
        .with_gateway(RetryGateway::new(RetryPolicy::no_retry())),
    );

    let challenge = challenges.issue_default("rp").unwrap();
    let presentation = Arc::new(Presentation {
        subject_id: "did:agentic:comet".into(),
        nonce: challenge.nonce,
        proof: "proof".into(),
        disclosed: Disclosure {
            role: "patient".into(),
            scopes: Vec::new(),
        },
        receipt: ReceiptRef {
            credential_hash: "lab-result-7".into(),
            issuer_did: "did:agentic:lab".into(),
            credential_type: CredentialType::MedicalRecord,
            attestation: "att".into(),
        },
    });

    let mut handles = Vec::new();
    for _ in 0..64 {
        let verifier = Arc::clone(&verifier);
        let presentation = Arc::clone(&presentation);
        handles.push(tokio::spawn(async move { verifier.verify(&presentation).await }));
    }

    let mut valid = 0;
    for h in handles {
        let result = h.await.unwrap();
        if result.is_valid() {
            valid += 1;
        } else {
            assert_eq!(result.error_code(), Some(ErrorCode::InvalidChallenge));
        }
    }
    assert_eq!(valid, 1);
}
