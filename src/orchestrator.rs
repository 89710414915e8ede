//! Orchestration context.
//!
//! The [`Orchestrator`] owns everything a group of convergence runs shares:
//! the remote client, the retry policy, the poll interval, and the
//! append-only collection of launched handles. There is no process-global
//! registry; callers pass the orchestrator where it is needed.
//!
//! Shutdown is explicit: [`Orchestrator::shutdown`] joins every outstanding
//! run before returning, so a program cannot exit while a remote mutation is
//! still in flight.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::info;

use crate::cfn::RemoteStackClient;
use crate::collection::StackCollection;
use crate::descriptor::StackDescriptor;
use crate::engine::{ConvergenceEngine, DEFAULT_POLL_INTERVAL};
use crate::handle::StackHandle;
use crate::outputs::StackResult;
use crate::retry::{RetryPolicy, RetryingClient};

/// Shared context for a group of concurrent convergence runs.
pub struct Orchestrator {
    client: Arc<dyn RemoteStackClient>,
    retry: RetryPolicy,
    poll_interval: Duration,
    handles: Mutex<Vec<StackHandle>>,
}

impl Orchestrator {
    /// Creates an orchestrator over the given remote client with default
    /// retry and polling behavior.
    #[must_use]
    pub fn new(client: Arc<dyn RemoteStackClient>) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Sets the retry policy applied to every remote call.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Sets the time between stack status polls.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Launches a convergence run for `descriptor` and records its handle.
    ///
    /// Returns immediately; the run executes on the tokio runtime and its
    /// result is read through the returned handle.
    pub fn submit(&self, descriptor: StackDescriptor) -> StackHandle {
        let engine = ConvergenceEngine::new(RetryingClient::new(self.client.clone(), self.retry))
            .with_poll_interval(self.poll_interval);
        let handle = StackHandle::spawn(engine, descriptor);
        self.lock_handles().push(handle.clone());
        handle
    }

    /// Returns a snapshot of every handle launched so far, in submission
    /// order.
    #[must_use]
    pub fn collection(&self) -> StackCollection {
        StackCollection::from(self.lock_handles().clone())
    }

    /// Waits until every launched run has reached a terminal state.
    pub async fn wait_all(&self) {
        self.collection().wait_all().await;
    }

    /// Waits for all runs and returns each stack's terminal result, keyed by
    /// stack name. Never fails itself.
    pub async fn results(&self) -> BTreeMap<String, StackResult> {
        self.collection().results().await
    }

    /// Waits for all runs and returns true iff none of them failed.
    pub async fn success(&self) -> bool {
        self.collection().success().await
    }

    /// Joins every outstanding run, then hands back the final collection.
    ///
    /// This is the teardown path: no run is abandoned mid-flight.
    pub async fn shutdown(self) -> StackCollection {
        let collection = self.collection();
        info!(stacks = collection.len(), "Shutting down; joining outstanding runs");
        collection.wait_all().await;
        collection
    }

    /// Locks the handle list, tolerating poisoning: a panicked submitter
    /// must not wedge teardown.
    fn lock_handles(&self) -> MutexGuard<'_, Vec<StackHandle>> {
        match self.handles.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("retry", &self.retry)
            .field("poll_interval", &self.poll_interval)
            .field("handles", &self.lock_handles().len())
            .finish_non_exhaustive()
    }
}
