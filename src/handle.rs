//! Asynchronous stack handles.
//!
//! A [`StackHandle`] is the fire-and-forget side of a convergence run:
//! constructing one schedules the engine on the tokio runtime and returns
//! immediately. The run's terminal result is reached through the handle (or
//! its [`StackOutputs`] view), which blocks on first access and afterwards
//! keeps returning the cached value.

use tracing::error;

use crate::descriptor::StackDescriptor;
use crate::engine::ConvergenceEngine;
use crate::outputs::{self, StackOutputs, StackResult};

/// Handle to one background convergence run.
#[derive(Debug, Clone)]
pub struct StackHandle {
    name: String,
    outputs: StackOutputs,
}

impl StackHandle {
    /// Schedules the engine run for `descriptor` on the current tokio
    /// runtime. Never blocks; failures surface when the result is read.
    #[must_use]
    pub fn spawn(engine: ConvergenceEngine, descriptor: StackDescriptor) -> Self {
        let name = descriptor.name.clone();
        let (slot, outputs) = outputs::result_cell(&name);

        let task_name = name.clone();
        tokio::spawn(async move {
            let result = engine.run(descriptor).await;
            if let Err(err) = &result {
                error!(stack = %task_name, error = %err, "Convergence failed");
            }
            slot.resolve(result);
        });

        Self { name, outputs }
    }

    /// Returns the stack name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the lazily-resolved output view.
    #[must_use]
    pub const fn outputs(&self) -> &StackOutputs {
        &self.outputs
    }

    /// Waits for the background run to reach a terminal state, discarding
    /// the outputs.
    ///
    /// # Errors
    ///
    /// Returns the run's captured error if it failed.
    pub async fn wait(&self) -> Result<(), crate::error::StackherdError> {
        self.outputs.wait().await
    }

    /// Waits for the background run and returns its terminal result.
    pub async fn result(&self) -> StackResult {
        self.outputs.resolved().await
    }

    /// Returns the terminal result without waiting, or `None` while the run
    /// is still in flight.
    #[must_use]
    pub fn try_result(&self) -> Option<StackResult> {
        self.outputs.try_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfn::fake::FakeCloudFormation;
    use crate::retry::{RetryPolicy, RetryingClient};
    use std::sync::Arc;

    fn engine_over(fake: &Arc<FakeCloudFormation>) -> ConvergenceEngine {
        ConvergenceEngine::new(RetryingClient::new(fake.clone(), RetryPolicy::default()))
    }

    fn vpc_descriptor(name: &str) -> StackDescriptor {
        StackDescriptor::new(name, "eu-west-1").with_template_body("{\"Resources\": {}}")
    }

    #[tokio::test(start_paused = true)]
    async fn test_construction_does_not_block_on_the_run() {
        let fake = Arc::new(FakeCloudFormation::new());
        let handle = StackHandle::spawn(engine_over(&fake), vpc_descriptor("net"));

        // The run has not been awaited yet; the result may or may not have
        // landed, but reading it must produce the terminal value.
        assert_eq!(handle.name(), "net");
        handle.wait().await.unwrap();
        assert!(handle.try_result().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_outputs_resolve_through_the_handle() {
        let fake = Arc::new(
            FakeCloudFormation::new().with_template_output("VpcId", "vpc-abc123"),
        );
        let handle = StackHandle::spawn(engine_over(&fake), vpc_descriptor("net"));

        let value = handle.outputs().get("VpcId").await.unwrap();
        assert_eq!(value, Some(String::from("vpc-abc123")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_run_repeats_its_error_on_every_read() {
        let fake = Arc::new(FakeCloudFormation::new().with_create_statuses(&["CREATE_FAILED"]));
        let handle = StackHandle::spawn(engine_over(&fake), vpc_descriptor("net"));

        let first = handle.result().await.unwrap_err();
        let second = handle.outputs().get("VpcId").await.unwrap_err();
        let third = handle.result().await.unwrap_err();

        assert_eq!(first.to_string(), second.to_string());
        assert_eq!(first.to_string(), third.to_string());
    }
}
