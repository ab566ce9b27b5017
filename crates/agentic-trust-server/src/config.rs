//! Gateway configuration, loaded from TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use agentic_trust::challenge::ChallengeConfig;
use agentic_trust::gateway::RetryPolicy;
use agentic_trust::index::IndexConfig;
use agentic_trust::presentation::VerifierConfig;
use agentic_trust::receipt::CredentialRecord;

use crate::error::{ServerError, ServerResult};

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerSection {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Presentation verifications still running after this are cancelled.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Where tier-3 issuer and agent lookups go.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum RegistryBackend {
    /// The built-in bootstrap records.
    #[default]
    Static,
    /// A registry proxy speaking JSON over HTTP.
    Http {
        base_url: String,
        #[serde(default = "default_http_timeout")]
        timeout_secs: u64,
    },
}

/// Where receipt status comes from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum ReceiptBackend {
    /// An empty in-process registry.
    #[default]
    Memory,
    /// In-process registry seeded with records from the config.
    Seeded { records: Vec<CredentialRecord> },
    /// An attestation service speaking JSON over HTTP.
    Http {
        base_url: String,
        #[serde(default = "default_http_timeout")]
        timeout_secs: u64,
    },
}

fn default_http_timeout() -> u64 {
    5
}

/// Policy table source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicySection {
    /// JSON policy file; the built-in table when unset.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Accept a table that leaves credential types uncovered.
    #[serde(default)]
    pub lenient: bool,
}

/// Persistent repositories.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageSection {
    /// Directory for the file repositories; in-memory when unset.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Top-level configuration for `trust-gateway`.
///
/// Loaded from a TOML file (typically `~/.agentic-trust/gateway.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub challenge: ChallengeConfig,

    #[serde(default)]
    pub verifier: VerifierConfig,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub registry: RegistryBackend,

    #[serde(default)]
    pub receipts: ReceiptBackend,

    #[serde(default)]
    pub policy: PolicySection,

    #[serde(default)]
    pub storage: StorageSection,
}

impl GatewayConfig {
    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> ServerResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> ServerResult<Self> {
        let config: GatewayConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> ServerResult<()> {
        if self.server.request_timeout_secs == 0 {
            return Err(ServerError::Config(
                "server.request_timeout_secs must be > 0".into(),
            ));
        }
        if self.index.ttl_secs == 0 {
            return Err(ServerError::Config("index.ttl_secs must be > 0".into()));
        }
        if self.index.max_cache_size == 0 {
            return Err(ServerError::Config(
                "index.max_cache_size must be > 0".into(),
            ));
        }
        if self.index.sync_interval_secs == 0 {
            return Err(ServerError::Config(
                "index.sync_interval_secs must be > 0".into(),
            ));
        }
        if self.challenge.default_ttl_secs == 0 || self.challenge.max_pending == 0 {
            return Err(ServerError::Config(
                "challenge.default_ttl_secs and challenge.max_pending must be > 0".into(),
            ));
        }
        if self.challenge.sweep_interval_secs == 0 {
            return Err(ServerError::Config(
                "challenge.sweep_interval_secs must be > 0".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ServerError::Config("retry.max_attempts must be >= 1".into()));
        }
        if self.retry.multiplier < 1.0 {
            return Err(ServerError::Config(format!(
                "retry.multiplier must be >= 1.0, got {}",
                self.retry.multiplier
            )));
        }
        if let RegistryBackend::Http { base_url, .. } = &self.registry {
            if base_url.trim().is_empty() {
                return Err(ServerError::Config("registry.base_url is empty".into()));
            }
        }
        if let ReceiptBackend::Http { base_url, .. } = &self.receipts {
            if base_url.trim().is_empty() {
                return Err(ServerError::Config("receipts.base_url is empty".into()));
            }
        }
        Ok(())
    }

    /// Audience for challenges requested without one.
    pub fn default_audience(&self) -> String {
        self.verifier
            .expected_audience
            .clone()
            .unwrap_or_else(|| "agentic-trust".to_string())
    }

    /// Return the path to the default config file location.
    pub fn default_config_path() -> PathBuf {
        agentic_trust::storage::default_store_dir()
            .map(|dir| dir.join("gateway.toml"))
            .unwrap_or_else(|| PathBuf::from("gateway.toml"))
    }
}
