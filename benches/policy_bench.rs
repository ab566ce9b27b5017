use std::sync::Arc;

use agentic_trust::index::TRUSTED_ISSUER_0_DID;
use agentic_trust::{
    AssuranceLevel, ChallengeStore, CredentialType, FraudPolicyEngine, Issuer, IssuerDomain,
    IssuerType, StaticRegistry, TrustIndex,
};
use criterion::{criterion_group, criterion_main, Criterion};

fn policy_benchmarks(c: &mut Criterion) {
    let engine = FraudPolicyEngine::builtin();

    // 1. Allowed issuer, full pipeline
    let clinic = Issuer::new(
        "did:agentic:clinic",
        IssuerType::Institution,
        AssuranceLevel::RegulatedEntity,
        "Riverside Clinic",
    )
    .with_domain(IssuerDomain::Medical);
    c.bench_function("assess_allow", |b| {
        b.iter(|| engine.assess(&clinic, CredentialType::MedicalRecord));
    });

    // 2. Brand impersonation, short-circuits on the first check
    let impostor = Issuer::new(
        "did:key:z6Mkimpostor",
        IssuerType::SelfSovereign,
        AssuranceLevel::Unverified,
        "Amazon Support",
    )
    .with_brand("Amazon Web Services");
    c.bench_function("assess_brand_impersonation", |b| {
        b.iter(|| engine.assess(&impostor, CredentialType::KycLevel1));
    });

    // 3. Revoked issuer with an earlier blocking finding
    let revoked = Issuer::new(
        "did:agentic:small_exchange",
        IssuerType::Corporation,
        AssuranceLevel::BasicKyc,
        "Small Exchange LLC",
    )
    .with_domain(IssuerDomain::Financial)
    .revoked();
    c.bench_function("assess_revoked", |b| {
        b.iter(|| engine.assess(&revoked, CredentialType::CryptoExchangeKyc));
    });
}

fn index_benchmarks(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let index = Arc::new(TrustIndex::in_memory(Arc::new(StaticRegistry::bootstrap())));
    rt.block_on(index.sync_from_registry())
        .expect("sync should succeed");

    let index = &index;

    // 4. Cached issuer lookup
    c.bench_function("find_issuer_cached", |b| {
        b.to_async(&rt)
            .iter(|| async move { index.find_issuer(TRUSTED_ISSUER_0_DID).await.unwrap() });
    });

    // 5. Brand lookup
    c.bench_function("find_issuer_by_brand", |b| {
        b.to_async(&rt)
            .iter(|| async move { index.find_issuer_by_brand("agenticdid").await.unwrap() });
    });

    // 6. Challenge issue + consume
    let store = ChallengeStore::default();
    c.bench_function("challenge_issue_consume", |b| {
        b.iter(|| {
            let challenge = store.issue_default("bench").unwrap();
            store.consume(&challenge.nonce).unwrap();
        });
    });
}

criterion_group!(benches, policy_benchmarks, index_benchmarks);
criterion_main!(benches);
