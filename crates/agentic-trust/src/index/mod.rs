//! Three-tier issuer and agent index.
//!
//! Lookups go through:
//!
//! 1. A bounded in-memory cache with a TTL ([`TtlCache`]).
//! 2. The authoritative repository ([`IssuerRepository`] / [`AgentRepository`]).
//! 3. The registry ([`RegistrySource`]), called through the [`RetryGateway`].
//!    Hits are written through to the repository and the cache.
//!
//! A claimed-brand index maps normalized brand names to issuer DIDs and is
//! maintained on every write.
//!
//! Local writes ([`TrustIndex::upsert`], [`TrustIndex::invalidate`]) bump a
//! generation counter while holding the cache lock. A registry result is only
//! committed if no local write happened while it was in flight; otherwise
//! the lookup starts again from the cache.
//!
//! Repository writes are serialized by a per-kind writer mutex and happen
//! before the cache lock is taken, so readers never wait on storage I/O.

pub mod brand;
pub mod cache;
pub mod registry;
pub mod repository;

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrustError};
use crate::gateway::RetryGateway;
use crate::issuer::{normalize_name, Agent, AgentQuery, Issuer, IssuerQuery};
use crate::time::{millis_to_rfc3339, Clock, SystemClock};

use brand::BrandIndex;
pub use cache::{CacheLookup, TtlCache};
pub use registry::{
    bootstrap_snapshot, RegistrySnapshot, RegistrySource, StaticRegistry, CANONICAL_AGENT_101_DID,
    ISSUER_AGENT_0_DID, TRUSTED_ISSUER_0_DID,
};
pub use repository::{
    AgentRepository, InMemoryAgentRepository, InMemoryIssuerRepository, IssuerRepository,
};

/// Lookups that lose a race with a local write are retried this many times.
const MAX_LOOKUP_ROUNDS: usize = 3;

// ── Configuration ────────────────────────────────────────────────────────────

/// Cache and sync settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Seconds a cached record stays fresh.
    pub ttl_secs: u64,
    /// Maximum cached records per kind.
    pub max_cache_size: usize,
    /// Seconds between background registry syncs.
    pub sync_interval_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 60,
            max_cache_size: 10_000,
            sync_interval_secs: 10,
        }
    }
}

// ── Records and reports ──────────────────────────────────────────────────────

/// Anything the index stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustRecord {
    Issuer(Issuer),
    Agent(Agent),
}

impl TrustRecord {
    pub fn did(&self) -> &str {
        match self {
            Self::Issuer(i) => &i.did,
            Self::Agent(a) => &a.did,
        }
    }
}

impl From<Issuer> for TrustRecord {
    fn from(issuer: Issuer) -> Self {
        Self::Issuer(issuer)
    }
}

impl From<Agent> for TrustRecord {
    fn from(agent: Agent) -> Self {
        Self::Agent(agent)
    }
}

/// Outcome of a registry sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub issuers: usize,
    pub agents: usize,
    /// Records the registry returned that failed validation.
    pub rejected: usize,
    pub duration_ms: u64,
}

/// Point-in-time counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub total_issuers: usize,
    pub total_agents: usize,
    pub cached_issuers: usize,
    pub cached_agents: usize,
    pub brands_indexed: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub registry_fallbacks: u64,
    pub is_syncing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<String>,
    pub ttl_secs: u64,
    pub max_cache_size: usize,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    fallbacks: AtomicU64,
}

/// Clears the syncing flag however the sync ends.
struct SyncGuard<'a>(&'a AtomicBool);

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Seed a record total from the repository, or start at zero.
fn initial_total(kind: &str, len: Result<usize>) -> AtomicUsize {
    match len {
        Ok(n) => AtomicUsize::new(n),
        Err(e) => {
            tracing::warn!(kind, error = %e, "could not count stored records, totals start at 0");
            AtomicUsize::new(0)
        }
    }
}

// ── TrustIndex ───────────────────────────────────────────────────────────────

/// Fast issuer and agent lookup over a cache, a repository and a registry.
pub struct TrustIndex {
    config: IndexConfig,
    issuers: Arc<dyn IssuerRepository>,
    agents: Arc<dyn AgentRepository>,
    registry: Arc<dyn RegistrySource>,
    gateway: RetryGateway,
    clock: Arc<dyn Clock>,

    issuer_cache: RwLock<TtlCache<Issuer>>,
    agent_cache: RwLock<TtlCache<Agent>>,
    /// Always locked after `issuer_cache`, never before.
    brands: RwLock<BrandIndex>,
    issuer_generation: AtomicU64,
    agent_generation: AtomicU64,
    /// Taken before the matching cache lock, never while holding it.
    issuer_writes: Mutex<()>,
    agent_writes: Mutex<()>,
    issuer_total: AtomicUsize,
    agent_total: AtomicUsize,

    counters: Counters,
    syncing: AtomicBool,
    last_sync_millis: AtomicU64,
}

impl TrustIndex {
    /// Create an index over the given tiers.
    pub fn new(
        config: IndexConfig,
        issuers: Arc<dyn IssuerRepository>,
        agents: Arc<dyn AgentRepository>,
        registry: Arc<dyn RegistrySource>,
    ) -> Self {
        let ttl_millis = config.ttl_secs.saturating_mul(1000);
        tracing::info!(
            ttl_secs = config.ttl_secs,
            max_cache_size = config.max_cache_size,
            registry = registry.name(),
            "trust index initialized"
        );
        let issuer_total = initial_total("issuer", issuers.len());
        let agent_total = initial_total("agent", agents.len());
        Self {
            issuer_cache: RwLock::new(TtlCache::new(ttl_millis, config.max_cache_size)),
            agent_cache: RwLock::new(TtlCache::new(ttl_millis, config.max_cache_size)),
            config,
            issuers,
            agents,
            registry,
            gateway: RetryGateway::default(),
            clock: Arc::new(SystemClock),
            brands: RwLock::new(BrandIndex::default()),
            issuer_generation: AtomicU64::new(0),
            agent_generation: AtomicU64::new(0),
            issuer_writes: Mutex::new(()),
            agent_writes: Mutex::new(()),
            issuer_total,
            agent_total,
            counters: Counters::default(),
            syncing: AtomicBool::new(false),
            last_sync_millis: AtomicU64::new(0),
        }
    }

    /// In-memory repositories in front of `registry`, default config.
    pub fn in_memory(registry: Arc<dyn RegistrySource>) -> Self {
        Self::new(
            IndexConfig::default(),
            Arc::new(InMemoryIssuerRepository::new()),
            Arc::new(InMemoryAgentRepository::new()),
            registry,
        )
    }

    pub fn with_gateway(mut self, gateway: RetryGateway) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    // ── Issuer lookup ────────────────────────────────────────────────────────

    /// Find an issuer by DID, falling through cache, repository and registry.
    ///
    /// Returns [`TrustError::NotFound`] when no tier has the DID; registry
    /// failures surface as the gateway's error.
    pub async fn find_issuer(&self, did: &str) -> Result<Issuer> {
        for round in 1..=MAX_LOOKUP_ROUNDS {
            let cached = read(&self.issuer_cache).get(did, self.now());
            if let CacheLookup::Fresh(issuer) = cached {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(issuer);
            }
            self.counters.misses.fetch_add(1, Ordering::Relaxed);

            let generation = self.issuer_generation.load(Ordering::SeqCst);
            if let Some(issuer) = self.issuers.get(did)? {
                self.cache_issuer_if_current(&issuer, generation);
                return Ok(issuer);
            }

            self.counters.fallbacks.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(did, registry = self.registry.name(), "issuer not indexed, asking registry");
            let registry = self.registry.as_ref();
            let fetched = self
                .gateway
                .call("registry.fetch_issuer", move || registry.fetch_issuer(did))
                .await?;

            let last_round = round == MAX_LOOKUP_ROUNDS;
            match fetched {
                Some(issuer) => {
                    issuer.validate()?;
                    if self.commit_issuer(&issuer, generation)? || last_round {
                        return Ok(issuer);
                    }
                }
                None => {
                    if last_round || self.issuer_generation.load(Ordering::SeqCst) == generation {
                        return Err(TrustError::NotFound(format!("issuer {did}")));
                    }
                }
            }
            tracing::debug!(did, "registry lookup raced with a local write, retrying");
        }
        Err(TrustError::NotFound(format!("issuer {did}")))
    }

    /// Find the issuer holding a claimed brand name.
    pub async fn find_issuer_by_brand(&self, brand: &str) -> Result<Issuer> {
        let normalized = normalize_name(brand);
        let did = read(&self.brands)
            .get(&normalized)
            .map(str::to_string)
            .ok_or_else(|| TrustError::NotFound(format!("brand {brand}")))?;
        self.find_issuer(&did).await
    }

    /// Issuers in the repository that match `query`, ordered by DID.
    pub fn find_issuers(&self, query: &IssuerQuery) -> Result<Vec<Issuer>> {
        Ok(self
            .issuers
            .list()?
            .into_iter()
            .filter(|i| query.matches(i))
            .collect())
    }

    // ── Agent lookup ─────────────────────────────────────────────────────────

    /// Find an agent by DID, falling through cache, repository and registry.
    pub async fn find_agent(&self, did: &str) -> Result<Agent> {
        for round in 1..=MAX_LOOKUP_ROUNDS {
            let cached = read(&self.agent_cache).get(did, self.now());
            if let CacheLookup::Fresh(agent) = cached {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(agent);
            }
            self.counters.misses.fetch_add(1, Ordering::Relaxed);

            let generation = self.agent_generation.load(Ordering::SeqCst);
            if let Some(agent) = self.agents.get(did)? {
                self.cache_agent_if_current(&agent, generation);
                return Ok(agent);
            }

            self.counters.fallbacks.fetch_add(1, Ordering::Relaxed);
            let registry = self.registry.as_ref();
            let fetched = self
                .gateway
                .call("registry.fetch_agent", move || registry.fetch_agent(did))
                .await?;

            let last_round = round == MAX_LOOKUP_ROUNDS;
            match fetched {
                Some(agent) => {
                    agent.validate()?;
                    if self.commit_agent(&agent, generation)? || last_round {
                        return Ok(agent);
                    }
                }
                None => {
                    if last_round || self.agent_generation.load(Ordering::SeqCst) == generation {
                        return Err(TrustError::NotFound(format!("agent {did}")));
                    }
                }
            }
            tracing::debug!(did, "registry lookup raced with a local write, retrying");
        }
        Err(TrustError::NotFound(format!("agent {did}")))
    }

    /// Agents in the repository that match `query`, ordered by DID.
    pub fn find_agents(&self, query: &AgentQuery) -> Result<Vec<Agent>> {
        Ok(self
            .agents
            .list()?
            .into_iter()
            .filter(|a| query.matches(a))
            .collect())
    }

    // ── Writes ───────────────────────────────────────────────────────────────

    /// Insert or replace a record in the repository, cache and brand index.
    pub fn upsert(&self, record: impl Into<TrustRecord>) -> Result<()> {
        match record.into() {
            TrustRecord::Issuer(issuer) => {
                issuer.validate()?;
                let _writes = lock(&self.issuer_writes);
                if self.issuers.put(&issuer)? {
                    self.issuer_total.fetch_add(1, Ordering::Relaxed);
                }
                let mut cache = write(&self.issuer_cache);
                self.issuer_generation.fetch_add(1, Ordering::SeqCst);
                write(&self.brands).record(&issuer);
                cache.insert(issuer.did.clone(), issuer, self.now());
            }
            TrustRecord::Agent(agent) => {
                agent.validate()?;
                let _writes = lock(&self.agent_writes);
                if self.agents.put(&agent)? {
                    self.agent_total.fetch_add(1, Ordering::Relaxed);
                }
                let mut cache = write(&self.agent_cache);
                self.agent_generation.fetch_add(1, Ordering::SeqCst);
                cache.insert(agent.did.clone(), agent, self.now());
            }
        }
        Ok(())
    }

    /// Drop any cached copy of `did`; the next lookup reloads it.
    pub fn invalidate(&self, did: &str) {
        {
            let mut cache = write(&self.issuer_cache);
            self.issuer_generation.fetch_add(1, Ordering::SeqCst);
            cache.remove(did);
        }
        {
            let mut cache = write(&self.agent_cache);
            self.agent_generation.fetch_add(1, Ordering::SeqCst);
            cache.remove(did);
        }
        tracing::debug!(did, "cache entry invalidated");
    }

    /// Empty both hot caches. Repositories and the brand index are kept.
    pub fn clear_caches(&self) {
        {
            let mut cache = write(&self.issuer_cache);
            self.issuer_generation.fetch_add(1, Ordering::SeqCst);
            cache.clear();
        }
        {
            let mut cache = write(&self.agent_cache);
            self.agent_generation.fetch_add(1, Ordering::SeqCst);
            cache.clear();
        }
        tracing::info!("caches cleared");
    }

    /// Write a registry result through, unless a local write got there first.
    ///
    /// Holding the writer mutex keeps upserts out between the generation
    /// check and the repository write. An invalidation in that window only
    /// skips the cache insert.
    fn commit_issuer(&self, issuer: &Issuer, generation: u64) -> Result<bool> {
        let _writes = lock(&self.issuer_writes);
        if self.issuer_generation.load(Ordering::SeqCst) != generation {
            return Ok(false);
        }
        if self.issuers.put(issuer)? {
            self.issuer_total.fetch_add(1, Ordering::Relaxed);
        }
        let mut cache = write(&self.issuer_cache);
        if self.issuer_generation.load(Ordering::SeqCst) == generation {
            write(&self.brands).record(issuer);
            cache.insert(issuer.did.clone(), issuer.clone(), self.now());
        }
        Ok(true)
    }

    fn commit_agent(&self, agent: &Agent, generation: u64) -> Result<bool> {
        let _writes = lock(&self.agent_writes);
        if self.agent_generation.load(Ordering::SeqCst) != generation {
            return Ok(false);
        }
        if self.agents.put(agent)? {
            self.agent_total.fetch_add(1, Ordering::Relaxed);
        }
        let mut cache = write(&self.agent_cache);
        if self.agent_generation.load(Ordering::SeqCst) == generation {
            cache.insert(agent.did.clone(), agent.clone(), self.now());
        }
        Ok(true)
    }

    /// Cache a repository read unless a local write has happened since.
    fn cache_issuer_if_current(&self, issuer: &Issuer, generation: u64) {
        let mut cache = write(&self.issuer_cache);
        if self.issuer_generation.load(Ordering::SeqCst) != generation {
            return;
        }
        write(&self.brands).record(issuer);
        cache.insert(issuer.did.clone(), issuer.clone(), self.now());
    }

    fn cache_agent_if_current(&self, agent: &Agent, generation: u64) {
        let mut cache = write(&self.agent_cache);
        if self.agent_generation.load(Ordering::SeqCst) != generation {
            return;
        }
        cache.insert(agent.did.clone(), agent.clone(), self.now());
    }

    // ── Sync ─────────────────────────────────────────────────────────────────

    /// Pull a full snapshot from the registry and upsert every record.
    ///
    /// Returns `Ok(None)` when another sync is already running.
    pub async fn sync_from_registry(&self) -> Result<Option<SyncReport>> {
        if self.syncing.swap(true, Ordering::SeqCst) {
            tracing::debug!("sync already in progress, skipping");
            return Ok(None);
        }
        let _guard = SyncGuard(&self.syncing);
        let started = self.clock.now_millis();

        let registry = self.registry.as_ref();
        let snapshot = self
            .gateway
            .call("registry.snapshot", move || registry.snapshot())
            .await?;

        let mut report = SyncReport::default();
        for issuer in snapshot.issuers {
            let did = issuer.did.clone();
            match self.upsert(issuer) {
                Ok(()) => report.issuers += 1,
                Err(TrustError::InvalidRecord(reason)) => {
                    tracing::warn!(did = %did, reason = %reason, "registry returned invalid issuer");
                    report.rejected += 1;
                }
                Err(e) => return Err(e),
            }
        }
        for agent in snapshot.agents {
            let did = agent.did.clone();
            match self.upsert(agent) {
                Ok(()) => report.agents += 1,
                Err(TrustError::InvalidRecord(reason)) => {
                    tracing::warn!(did = %did, reason = %reason, "registry returned invalid agent");
                    report.rejected += 1;
                }
                Err(e) => return Err(e),
            }
        }

        let finished = self.clock.now_millis();
        report.duration_ms = finished.saturating_sub(started);
        self.last_sync_millis.store(finished.max(1), Ordering::SeqCst);
        tracing::info!(
            issuers = report.issuers,
            agents = report.agents,
            rejected = report.rejected,
            duration_ms = report.duration_ms,
            "registry sync complete"
        );
        Ok(Some(report))
    }

    /// Whether at least one sync has completed.
    pub fn is_synced(&self) -> bool {
        self.last_sync_millis.load(Ordering::SeqCst) != 0
    }

    // ── Stats ────────────────────────────────────────────────────────────────

    /// Record totals count what this index wrote on top of what the
    /// repositories held when it was created.
    pub fn stats(&self) -> IndexStats {
        let last = self.last_sync_millis.load(Ordering::SeqCst);
        IndexStats {
            total_issuers: self.issuer_total.load(Ordering::Relaxed),
            total_agents: self.agent_total.load(Ordering::Relaxed),
            cached_issuers: read(&self.issuer_cache).len(),
            cached_agents: read(&self.agent_cache).len(),
            brands_indexed: read(&self.brands).len(),
            cache_hits: self.counters.hits.load(Ordering::Relaxed),
            cache_misses: self.counters.misses.load(Ordering::Relaxed),
            registry_fallbacks: self.counters.fallbacks.load(Ordering::Relaxed),
            is_syncing: self.syncing.load(Ordering::SeqCst),
            last_sync: (last != 0).then(|| millis_to_rfc3339(last)),
            ttl_secs: self.config.ttl_secs,
            max_cache_size: self.config.max_cache_size,
        }
    }

    fn now(&self) -> u64 {
        self.clock.now_millis()
    }
}

impl std::fmt::Debug for TrustIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustIndex")
            .field("config", &self.config)
            .field("registry", &self.registry.name())
            .finish_non_exhaustive()
    }
}
