//! Aggregation over many stack handles.
//!
//! A [`StackCollection`] is an insertion-ordered, append-only list of
//! handles with bulk operations: wait for every run to finish, collect all
//! terminal results (failures included, as data), and check overall success.

use std::collections::BTreeMap;

use crate::handle::StackHandle;
use crate::outputs::StackResult;

/// Ordered, append-only collection of stack handles.
#[derive(Debug, Clone, Default)]
pub struct StackCollection {
    handles: Vec<StackHandle>,
}

impl StackCollection {
    /// Creates an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    /// Appends a handle.
    pub fn push(&mut self, handle: StackHandle) {
        self.handles.push(handle);
    }

    /// Returns the number of handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns true if the collection holds no handles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Iterates the handles in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, StackHandle> {
        self.handles.iter()
    }

    /// Blocks until every handle's background run has reached a terminal
    /// state, success or failure.
    pub async fn wait_all(&self) {
        for handle in &self.handles {
            // Failures are reported as data by results(); waiting only
            // cares about termination.
            let _ = handle.wait().await;
        }
    }

    /// Waits for all runs and returns each stack's terminal result, keyed by
    /// stack name. Never fails itself; individual failures appear as `Err`
    /// entries.
    pub async fn results(&self) -> BTreeMap<String, StackResult> {
        let mut results = BTreeMap::new();
        for handle in &self.handles {
            results.insert(handle.name().to_string(), handle.result().await);
        }
        results
    }

    /// Waits for all runs and returns true iff none of them failed.
    pub async fn success(&self) -> bool {
        for handle in &self.handles {
            if handle.wait().await.is_err() {
                return false;
            }
        }
        true
    }
}

impl From<Vec<StackHandle>> for StackCollection {
    fn from(handles: Vec<StackHandle>) -> Self {
        Self { handles }
    }
}

impl<'a> IntoIterator for &'a StackCollection {
    type Item = &'a StackHandle;
    type IntoIter = std::slice::Iter<'a, StackHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfn::fake::FakeCloudFormation;
    use crate::descriptor::StackDescriptor;
    use crate::engine::ConvergenceEngine;
    use crate::retry::{RetryPolicy, RetryingClient};
    use std::sync::Arc;

    fn spawn_over(fake: &Arc<FakeCloudFormation>, name: &str) -> StackHandle {
        let engine =
            ConvergenceEngine::new(RetryingClient::new(fake.clone(), RetryPolicy::default()));
        let descriptor =
            StackDescriptor::new(name, "eu-west-1").with_template_body("{\"Resources\": {}}");
        StackHandle::spawn(engine, descriptor)
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_keyed_by_stack_name() {
        let fake = Arc::new(FakeCloudFormation::new().with_template_output("Id", "i-1"));
        let mut collection = StackCollection::new();
        collection.push(spawn_over(&fake, "alpha"));
        collection.push(spawn_over(&fake, "beta"));

        let results = collection.results().await;

        assert_eq!(results.len(), 2);
        assert!(results["alpha"].is_ok());
        assert!(results["beta"].is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_failure_flips_success_but_not_results() {
        let healthy = Arc::new(FakeCloudFormation::new());
        let broken = Arc::new(FakeCloudFormation::new().with_create_statuses(&["CREATE_FAILED"]));

        let mut collection = StackCollection::new();
        collection.push(spawn_over(&healthy, "alpha"));
        collection.push(spawn_over(&broken, "beta"));
        collection.push(spawn_over(&healthy, "gamma"));

        assert!(!collection.success().await);

        let results = collection.results().await;
        assert_eq!(results.len(), 3);
        let failed = results.values().filter(|r| r.is_err()).count();
        assert_eq!(failed, 1);
        assert!(results["beta"].is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_all_returns_only_after_every_run_terminated() {
        let fake = Arc::new(FakeCloudFormation::new());
        let mut collection = StackCollection::new();
        for name in ["alpha", "beta", "gamma"] {
            collection.push(spawn_over(&fake, name));
        }

        collection.wait_all().await;

        for handle in &collection {
            assert!(handle.try_result().is_some());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_collection_is_successful() {
        let collection = StackCollection::new();
        collection.wait_all().await;
        assert!(collection.success().await);
        assert!(collection.results().await.is_empty());
        assert!(collection.is_empty());
    }
}
