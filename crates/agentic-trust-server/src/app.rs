//! Wiring: build the verifier from configuration and run background upkeep.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use agentic_trust::gateway::{HttpReceiptStatus, HttpRegistry, RetryGateway};
use agentic_trust::index::{
    AgentRepository, InMemoryAgentRepository, InMemoryIssuerRepository, IssuerRepository,
    RegistrySource, StaticRegistry, TrustIndex,
};
use agentic_trust::policy::{BrandRegistry, FraudPolicyEngine, PolicyTable};
use agentic_trust::receipt::{InMemoryReceiptRegistry, ReceiptStatusProvider};
use agentic_trust::storage::{FileAgentRepository, FileIssuerRepository};
use agentic_trust::{ChallengeStore, PresentationVerifier};

use crate::config::{GatewayConfig, ReceiptBackend, RegistryBackend};
use crate::error::ServerResult;

/// Build every component named in `config` and return the verifier that owns them.
pub fn build_verifier(config: &GatewayConfig) -> ServerResult<Arc<PresentationVerifier>> {
    let policies = match &config.policy.file {
        Some(path) => {
            info!(path = %path.display(), lenient = config.policy.lenient, "loading policy table");
            PolicyTable::load(path, config.policy.lenient)?
        }
        None => PolicyTable::builtin(),
    };
    let engine = Arc::new(FraudPolicyEngine::new(policies, BrandRegistry::builtin()));

    let (issuers, agents): (Arc<dyn IssuerRepository>, Arc<dyn AgentRepository>) =
        match &config.storage.data_dir {
            Some(dir) => {
                info!(dir = %dir.display(), "using file repositories");
                (
                    Arc::new(FileIssuerRepository::open(dir)?),
                    Arc::new(FileAgentRepository::open(dir)?),
                )
            }
            None => (
                Arc::new(InMemoryIssuerRepository::new()),
                Arc::new(InMemoryAgentRepository::new()),
            ),
        };

    let registry: Arc<dyn RegistrySource> = match &config.registry {
        RegistryBackend::Static => Arc::new(StaticRegistry::bootstrap()),
        RegistryBackend::Http {
            base_url,
            timeout_secs,
        } => Arc::new(HttpRegistry::new(
            base_url,
            Duration::from_secs(*timeout_secs),
        )?),
    };

    let receipts: Arc<dyn ReceiptStatusProvider> = match &config.receipts {
        ReceiptBackend::Memory => Arc::new(InMemoryReceiptRegistry::new()),
        ReceiptBackend::Seeded { records } => {
            let registry = InMemoryReceiptRegistry::new();
            for record in records {
                registry.register(record.clone());
            }
            info!(records = registry.len(), "seeded receipt registry");
            Arc::new(registry)
        }
        ReceiptBackend::Http {
            base_url,
            timeout_secs,
        } => Arc::new(HttpReceiptStatus::new(
            base_url,
            Duration::from_secs(*timeout_secs),
        )?),
    };

    let gateway = RetryGateway::new(config.retry.clone());
    let index = Arc::new(
        TrustIndex::new(config.index.clone(), issuers, agents, registry)
            .with_gateway(gateway.clone()),
    );
    let challenges = Arc::new(ChallengeStore::new(config.challenge.clone()));

    let verifier = PresentationVerifier::new(index, challenges, engine, receipts)
        .with_gateway(gateway)
        .with_config(config.verifier.clone());
    Ok(Arc::new(verifier))
}

/// Start the periodic registry sync and challenge sweep.
///
/// The first sync runs immediately; the gateway answers 503 on verification
/// routes until it succeeds.
pub fn spawn_maintenance(
    verifier: Arc<PresentationVerifier>,
    config: &GatewayConfig,
) -> Vec<JoinHandle<()>> {
    let sync_every = Duration::from_secs(config.index.sync_interval_secs);
    let sweep_every = Duration::from_secs(config.challenge.sweep_interval_secs);

    let sync_verifier = verifier.clone();
    let sync = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sync_every);
        loop {
            ticker.tick().await;
            if let Err(e) = sync_verifier.index().sync_from_registry().await {
                warn!(error = %e, "registry sync failed");
            }
        }
    });

    let sweep = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_every);
        // The first tick completes immediately; nothing has expired yet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            verifier.challenges().sweep_expired();
        }
    });

    vec![sync, sweep]
}
