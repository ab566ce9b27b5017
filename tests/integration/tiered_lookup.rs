//! Integration test: TrustIndex tier fall-through.
//!
//! Cache → repository → registry, with the filesystem repository as the
//! authoritative tier and a counting registry in front of the bootstrap
//! records.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use agentic_trust::index::{
    IssuerRepository, RegistrySnapshot, ISSUER_AGENT_0_DID, TRUSTED_ISSUER_0_DID,
};
use agentic_trust::storage::{FileAgentRepository, FileIssuerRepository};
use agentic_trust::time::ManualClock;
use agentic_trust::{
    Agent, AgentRole, AssuranceLevel, IndexConfig, Issuer, IssuerDomain, IssuerType,
    RegistrySource, Result, RetryGateway, RetryPolicy, StaticRegistry, TrustError, TrustIndex,
};

/// Counts every registry call and delegates to a static registry.
struct CountingRegistry {
    inner: StaticRegistry,
    calls: AtomicUsize,
}

impl CountingRegistry {
    fn new(inner: StaticRegistry) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistrySource for CountingRegistry {
    fn name(&self) -> &str {
        "counting-registry"
    }

    async fn fetch_issuer(&self, did: &str) -> Result<Option<Issuer>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_issuer(did).await
    }

    async fn fetch_agent(&self, did: &str) -> Result<Option<Agent>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_agent(did).await
    }

    async fn snapshot(&self) -> Result<RegistrySnapshot> {
        self.inner.snapshot().await
    }
}

/// A registry that is never reachable.
struct DownRegistry;

#[async_trait]
impl RegistrySource for DownRegistry {
    fn name(&self) -> &str {
        "down-registry"
    }

    async fn fetch_issuer(&self, _did: &str) -> Result<Option<Issuer>> {
        Err(TrustError::Unavailable {
            service: "registry".into(),
            reason: "connection refused".into(),
        })
    }

    async fn fetch_agent(&self, _did: &str) -> Result<Option<Agent>> {
        Err(TrustError::Unavailable {
            service: "registry".into(),
            reason: "connection refused".into(),
        })
    }

    async fn snapshot(&self) -> Result<RegistrySnapshot> {
        Err(TrustError::Unavailable {
            service: "registry".into(),
            reason: "connection refused".into(),
        })
    }
}

struct Tiers {
    index: TrustIndex,
    registry: Arc<CountingRegistry>,
    issuers: Arc<FileIssuerRepository>,
    clock: Arc<ManualClock>,
    _dir: tempfile::TempDir,
}

fn tiers(registry: StaticRegistry) -> Tiers {
    let dir = tempfile::tempdir().expect("tempdir");
    let issuers = Arc::new(FileIssuerRepository::open(dir.path()).expect("issuer repo"));
    let agents = Arc::new(FileAgentRepository::open(dir.path()).expect("agent repo"));
    let registry = Arc::new(CountingRegistry::new(registry));
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));

    let index = TrustIndex::new(
        IndexConfig::default(),
        issuers.clone(),
        agents,
        registry.clone(),
    )
    .with_gateway(RetryGateway::new(RetryPolicy::no_retry()))
    .with_clock(clock.clone());

    Tiers {
        index,
        registry,
        issuers,
        clock,
        _dir: dir,
    }
}

#[tokio::test]
async fn registry_hit_is_written_through_and_cached() {
    let t = tiers(StaticRegistry::bootstrap());

    let issuer = t.index.find_issuer(TRUSTED_ISSUER_0_DID).await.unwrap();
    assert_eq!(issuer.issuer_type, IssuerType::Corporation);
    assert_eq!(t.registry.calls(), 1);

    // Written through to the file repository.
    let stored = t.issuers.get(TRUSTED_ISSUER_0_DID).unwrap();
    assert_eq!(stored.as_ref(), Some(&issuer));

    // Second lookup is served from the cache.
    let again = t.index.find_issuer(TRUSTED_ISSUER_0_DID).await.unwrap();
    assert_eq!(again, issuer);
    assert_eq!(t.registry.calls(), 1);

    let stats = t.index.stats();
    assert_eq!(stats.registry_fallbacks, 1);
    assert!(stats.cache_hits >= 1);
}

#[tokio::test]
async fn stale_cache_falls_back_to_repository() {
    let t = tiers(StaticRegistry::bootstrap());
    let original = t.index.find_issuer(TRUSTED_ISSUER_0_DID).await.unwrap();

    // Change the authoritative record behind the index's back.
    let mut renamed = original.clone();
    renamed.legal_name = "AgenticDID Foundation (renamed)".into();
    t.issuers.put(&renamed).unwrap();

    // Within the TTL the cached copy is served.
    t.clock.advance_secs(30);
    let cached = t.index.find_issuer(TRUSTED_ISSUER_0_DID).await.unwrap();
    assert_eq!(cached.legal_name, original.legal_name);

    // Past the TTL the repository wins, without asking the registry.
    t.clock.advance_secs(31);
    let reloaded = t.index.find_issuer(TRUSTED_ISSUER_0_DID).await.unwrap();
    assert_eq!(reloaded.legal_name, renamed.legal_name);
    assert_eq!(t.registry.calls(), 1);
}

#[tokio::test]
async fn upsert_is_visible_within_ttl() {
    let t = tiers(StaticRegistry::bootstrap());
    let original = t.index.find_issuer(TRUSTED_ISSUER_0_DID).await.unwrap();

    t.index.upsert(original.clone().revoked()).unwrap();
    let after = t.index.find_issuer(TRUSTED_ISSUER_0_DID).await.unwrap();
    assert!(after.is_revoked);
}

#[tokio::test]
async fn invalidate_forces_repository_reload() {
    let t = tiers(StaticRegistry::bootstrap());
    let original = t.index.find_issuer(TRUSTED_ISSUER_0_DID).await.unwrap();

    let mut moved = original.clone();
    moved.jurisdiction = Some("EU".into());
    t.issuers.put(&moved).unwrap();

    t.index.invalidate(TRUSTED_ISSUER_0_DID);
    let reloaded = t.index.find_issuer(TRUSTED_ISSUER_0_DID).await.unwrap();
    assert_eq!(reloaded.jurisdiction.as_deref(), Some("EU"));
}

#[tokio::test]
async fn unknown_did_is_not_found() {
    let t = tiers(StaticRegistry::bootstrap());
    let err = t.index.find_issuer("did:agentic:nobody").await.unwrap_err();
    assert!(matches!(err, TrustError::NotFound(_)));
}

#[tokio::test]
async fn registry_outage_surfaces_as_unavailable() {
    let index = TrustIndex::in_memory(Arc::new(DownRegistry))
        .with_gateway(RetryGateway::new(RetryPolicy::no_retry()));

    let err = index.find_issuer("did:agentic:anyone").await.unwrap_err();
    assert!(err.is_unavailable());

    // Locally known records still resolve.
    let local = Issuer::new(
        "did:agentic:local",
        IssuerType::Institution,
        AssuranceLevel::RegulatedEntity,
        "Local University",
    )
    .with_domain(IssuerDomain::Education);
    index.upsert(local.clone()).unwrap();
    assert_eq!(index.find_issuer("did:agentic:local").await.unwrap(), local);
}

#[tokio::test]
async fn sync_populates_brand_index_and_agents() {
    let registry = StaticRegistry::bootstrap().with_issuer(
        Issuer::new(
            "did:agentic:delta",
            IssuerType::Corporation,
            AssuranceLevel::RegulatedEntity,
            "Delta Air Lines, Inc.",
        )
        .with_domain(IssuerDomain::Travel)
        .with_brand("Delta"),
    );
    let t = tiers(registry);

    let report = t.index.sync_from_registry().await.unwrap().unwrap();
    assert_eq!(report.issuers, 2);
    assert!(t.index.is_synced());

    let delta = t.index.find_issuer_by_brand("  DELTA ").await.unwrap();
    assert_eq!(delta.did, "did:agentic:delta");

    let agent = t.index.find_agent(ISSUER_AGENT_0_DID).await.unwrap();
    assert_eq!(agent.role, AgentRole::IssuerAgent);
    assert_eq!(agent.parent_issuer_did.as_deref(), Some(TRUSTED_ISSUER_0_DID));

    // Everything came from the snapshot; no per-record registry calls.
    assert_eq!(t.registry.calls(), 0);
}
