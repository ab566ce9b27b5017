//! Retry gateway, the single path for calls to remote dependencies.
//!
//! The gateway module provides:
//! - Exponential backoff with a per-attempt timeout ([`retry`])
//! - Call timing and failure logging ([`logging`])
//! - HTTP collaborators for the registry and receipt status (`remote` feature)

pub mod logging;
#[cfg(feature = "remote")]
pub mod remote;
pub mod retry;

use std::future::Future;

use crate::error::Result;

pub use logging::with_logging;
#[cfg(feature = "remote")]
pub use remote::{HttpReceiptStatus, HttpRegistry};
pub use retry::{with_retry, RetryPolicy};

/// Wraps remote calls in retry and logging.
#[derive(Debug, Clone, Default)]
pub struct RetryGateway {
    policy: RetryPolicy,
}

impl RetryGateway {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `op` with the gateway's retry policy, logging the overall outcome.
    pub async fn call<T, F, Fut>(&self, operation: &str, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        with_logging(operation, with_retry(&self.policy, operation, op)).await
    }
}
