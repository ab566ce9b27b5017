//! HTTP JSON collaborators for the registry and receipt status.
//!
//! Endpoints, relative to the configured base URL:
//!
//! - `GET issuers/{did}` → [`Issuer`], 404 when absent
//! - `GET agents/{did}` → [`Agent`], 404 when absent
//! - `GET snapshot` → [`RegistrySnapshot`]
//! - `GET receipts/{credential_hash}` → [`ReceiptStatus`], 404 when unknown
//!
//! Connection failures, 429 and 5xx are reported as
//! [`TrustError::Unavailable`] so the gateway retries them; other statuses
//! are definitive [`TrustError::Remote`] errors.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::{Result, TrustError};
use crate::index::{RegistrySnapshot, RegistrySource};
use crate::issuer::{Agent, Issuer};
use crate::receipt::{ReceiptStatus, ReceiptStatusProvider};

const USER_AGENT: &str = concat!("agentic-trust/", env!("CARGO_PKG_VERSION"));

/// Shared JSON-over-HTTP plumbing.
#[derive(Debug, Clone)]
struct JsonClient {
    service: &'static str,
    base: Url,
    client: reqwest::Client,
}

impl JsonClient {
    fn new(service: &'static str, base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(base_url).map_err(|e| TrustError::Remote {
            service: service.into(),
            reason: format!("invalid base url {base_url}: {e}"),
        })?;
        if base.cannot_be_a_base() {
            return Err(TrustError::Remote {
                service: service.into(),
                reason: format!("base url cannot carry paths: {base_url}"),
            });
        }
        // Keep the last path segment when joining.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TrustError::Remote {
                service: service.into(),
                reason: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            service,
            base,
            client,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| TrustError::Remote {
                service: self.service.into(),
                reason: "base url cannot carry paths".into(),
            })?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    /// GET a JSON document; `Ok(None)` on 404.
    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<Option<T>> {
        let url = self.url(segments)?;
        let response = self
            .client
            .get(url.clone())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| TrustError::Unavailable {
                service: self.service.into(),
                reason: format!("request to {url} failed: {e}"),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(TrustError::Unavailable {
                service: self.service.into(),
                reason: format!("{url} returned HTTP {status}"),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrustError::Remote {
                service: self.service.into(),
                reason: format!("{url} returned HTTP {status}: {body}"),
            });
        }

        response.json::<T>().await.map(Some).map_err(|e| TrustError::Remote {
            service: self.service.into(),
            reason: format!("failed to parse response from {url}: {e}"),
        })
    }
}

// ── HttpRegistry ──────────────────────────────────────────────────────────────

/// [`RegistrySource`] backed by an HTTP registry proxy.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    http: JsonClient,
}

impl HttpRegistry {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: JsonClient::new("registry", base_url, timeout)?,
        })
    }
}

#[async_trait]
impl RegistrySource for HttpRegistry {
    fn name(&self) -> &str {
        "http-registry"
    }

    async fn fetch_issuer(&self, did: &str) -> Result<Option<Issuer>> {
        self.http.get(&["issuers", did]).await
    }

    async fn fetch_agent(&self, did: &str) -> Result<Option<Agent>> {
        self.http.get(&["agents", did]).await
    }

    async fn snapshot(&self) -> Result<RegistrySnapshot> {
        Ok(self.http.get(&["snapshot"]).await?.unwrap_or_default())
    }
}

// ── HttpReceiptStatus ─────────────────────────────────────────────────────────

/// [`ReceiptStatusProvider`] backed by an HTTP attestation service.
#[derive(Debug, Clone)]
pub struct HttpReceiptStatus {
    http: JsonClient,
}

impl HttpReceiptStatus {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: JsonClient::new("receipt-status", base_url, timeout)?,
        })
    }
}

#[async_trait]
impl ReceiptStatusProvider for HttpReceiptStatus {
    fn name(&self) -> &str {
        "http-receipt-status"
    }

    async fn check(&self, credential_hash: &str) -> Result<ReceiptStatus> {
        Ok(self
            .http
            .get(&["receipts", credential_hash])
            .await?
            .unwrap_or(ReceiptStatus::Unknown))
    }
}
