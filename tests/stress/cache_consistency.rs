//! Stress test: TrustIndex cache consistency under concurrent writes.
//!
//! A lookup must always reflect the latest upsert/invalidate for a DID, even
//! inside the TTL window, and a registry fetch that raced with a local write
//! must never overwrite it.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;

use agentic_trust::index::RegistrySnapshot;
use agentic_trust::{
    Agent, AssuranceLevel, Issuer, IssuerDomain, IssuerType, RegistrySource, Result,
    RetryGateway, RetryPolicy, StaticRegistry, TrustIndex,
};

const DID: &str = "did:agentic:acme";

fn acme(version: usize) -> Issuer {
    Issuer::new(
        DID,
        IssuerType::Corporation,
        AssuranceLevel::RegulatedEntity,
        format!("Acme Corp v{version}"),
    )
    .with_domain(IssuerDomain::Commerce)
}

fn index(registry: Arc<dyn RegistrySource>) -> Arc<TrustIndex> {
    Arc::new(
        TrustIndex::in_memory(registry).with_gateway(RetryGateway::new(RetryPolicy::no_retry())),
    )
}

/// Registry whose issuer fetch parks until the test releases it.
struct ParkedRegistry {
    stale: Issuer,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl RegistrySource for ParkedRegistry {
    fn name(&self) -> &str {
        "parked-registry"
    }

    async fn fetch_issuer(&self, did: &str) -> Result<Option<Issuer>> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok((did == self.stale.did).then(|| self.stale.clone()))
    }

    async fn fetch_agent(&self, _did: &str) -> Result<Option<Agent>> {
        Ok(None)
    }

    async fn snapshot(&self) -> Result<RegistrySnapshot> {
        Ok(RegistrySnapshot::default())
    }
}

#[tokio::test]
async fn stress_registry_fetch_racing_upsert_is_discarded() {
    let registry = Arc::new(ParkedRegistry {
        stale: acme(0),
        entered: Notify::new(),
        release: Notify::new(),
    });
    let index = index(registry.clone());

    let lookup = {
        let index = Arc::clone(&index);
        tokio::spawn(async move { index.find_issuer(DID).await })
    };

    // The lookup is parked inside the registry; write a newer record.
    registry.entered.notified().await;
    index.upsert(acme(1)).unwrap();
    registry.release.notify_one();

    let found = lookup.await.unwrap().unwrap();
    assert_eq!(found.legal_name, "Acme Corp v1");
    assert_eq!(index.find_issuer(DID).await.unwrap().legal_name, "Acme Corp v1");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn stress_readers_never_see_unwritten_versions() {
    let index = index(Arc::new(StaticRegistry::default()));
    index.upsert(acme(0)).unwrap();

    let writer = {
        let index = Arc::clone(&index);
        tokio::spawn(async move {
            for v in 1..=500 {
                index.upsert(acme(v)).unwrap();
                if v % 50 == 0 {
                    index.invalidate(DID);
                }
                tokio::task::yield_now().await;
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..8 {
        let index = Arc::clone(&index);
        readers.push(tokio::spawn(async move {
            let mut last_seen = 0usize;
            for _ in 0..500 {
                let issuer = index.find_issuer(DID).await.unwrap();
                let version: usize = issuer
                    .legal_name
                    .trim_start_matches("Acme Corp v")
                    .parse()
                    .unwrap();
                assert!(version <= 500);
                // A single reader never goes back in time.
                assert!(version >= last_seen, "saw v{version} after v{last_seen}");
                last_seen = version;
                tokio::task::yield_now().await;
            }
        }));
    }

    writer.await.unwrap();
    for r in readers {
        r.await.unwrap();
    }

    // After the last write, every lookup returns it.
    assert_eq!(index.find_issuer(DID).await.unwrap().legal_name, "Acme Corp v500");
    index.invalidate(DID);
    assert_eq!(index.find_issuer(DID).await.unwrap().legal_name, "Acme Corp v500");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stress_many_dids_with_small_cache() {
    let index = Arc::new(
        TrustIndex::new(
            agentic_trust::IndexConfig {
                ttl_secs: 60,
                max_cache_size: 16,
                sync_interval_secs: 10,
            },
            Arc::new(agentic_trust::index::InMemoryIssuerRepository::new()),
            Arc::new(agentic_trust::index::InMemoryAgentRepository::new()),
            Arc::new(StaticRegistry::default()),
        )
        .with_gateway(RetryGateway::new(RetryPolicy::no_retry())),
    );

    for i in 0..200 {
        let issuer = Issuer::new(
            format!("did:agentic:org_{i}"),
            IssuerType::Corporation,
            AssuranceLevel::BasicKyc,
            format!("Org {i}"),
        );
        index.upsert(issuer).unwrap();
    }

    let mut handles = Vec::new();
    for t in 0..4 {
        let index = Arc::clone(&index);
        handles.push(tokio::spawn(async move {
            for i in 0..200 {
                let n = (i * 7 + t * 13) % 200;
                let issuer = index.find_issuer(&format!("did:agentic:org_{n}")).await.unwrap();
                assert_eq!(issuer.legal_name, format!("Org {n}"));
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let stats = index.stats();
    assert_eq!(stats.total_issuers, 200);
    assert!(stats.cached_issuers <= 16);
}
