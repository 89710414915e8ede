//! Bounded exponential-backoff retry around the remote client.
//!
//! [`RetryingClient`] decorates a [`RemoteStackClient`], retrying each call on
//! transient (throttling) errors with delays growing as
//! `base_delay * 2^attempt`, up to a fixed attempt cap. Any non-transient
//! error, and the last transient error once the cap is exhausted, propagates
//! unchanged.
//!
//! The convergence engine only ever talks to the service through this
//! decorator; completion polling inherits it too, since the trait's provided
//! `wait_for_completion` describes through `self`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::cfn::{CreateStackRequest, RemoteStack, RemoteStackClient, UpdateStackRequest};
use crate::error::Result;

/// Retry behavior for transient service errors.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts per call, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent one.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Computes the backoff delay after the given attempt (0-indexed):
    /// `base_delay * 2^attempt`, saturating.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2_u32.saturating_pow(attempt))
    }
}

/// Retrying decorator over a remote stack client.
#[derive(Clone)]
pub struct RetryingClient {
    inner: Arc<dyn RemoteStackClient>,
    policy: RetryPolicy,
}

impl RetryingClient {
    /// Wraps a client with the given retry policy.
    #[must_use]
    pub fn new(inner: Arc<dyn RemoteStackClient>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// Runs one remote call, retrying transient failures with backoff.
    async fn invoke<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt + 1 < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient service error; backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl std::fmt::Debug for RetryingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingClient")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RemoteStackClient for RetryingClient {
    fn region(&self) -> Option<&str> {
        self.inner.region()
    }

    async fn describe(&self, name: &str) -> Result<Option<RemoteStack>> {
        self.invoke("describe", || self.inner.describe(name)).await
    }

    async fn create(&self, request: &CreateStackRequest) -> Result<()> {
        self.invoke("create", || self.inner.create(request)).await
    }

    async fn update(&self, request: &UpdateStackRequest) -> Result<()> {
        self.invoke("update", || self.inner.update(request)).await
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.invoke("delete", || self.inner.delete(name)).await
    }
}
