//! Remote stack client trait definition.
//!
//! This module defines the capability interface the convergence engine depends
//! on. Everything the engine knows about the remote service goes through these
//! five operations; concrete backends (the AWS adapter, test fakes, retry
//! decorators) implement or wrap them.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::types::{CreateStackRequest, OperationKind, RemoteStack, UpdateStackRequest};
use crate::error::{Result, StackherdError};

/// Trait for remote CloudFormation backends.
#[async_trait]
pub trait RemoteStackClient: Send + Sync {
    /// Returns the region this client is scoped to, when it is scoped to
    /// one. A run whose descriptor declares a different region is rejected
    /// before any remote call.
    fn region(&self) -> Option<&str> {
        None
    }

    /// Describes the named stack.
    ///
    /// Returns `None` if no stack with that name exists. A missing stack is
    /// an expected condition, not an error.
    async fn describe(&self, name: &str) -> Result<Option<RemoteStack>>;

    /// Submits a stack creation.
    ///
    /// Fails with [`ServiceError::AlreadyExists`] if the name is taken.
    ///
    /// [`ServiceError::AlreadyExists`]: crate::error::ServiceError::AlreadyExists
    async fn create(&self, request: &CreateStackRequest) -> Result<()>;

    /// Submits a stack update.
    ///
    /// Fails with [`ServiceError::NoUpdatesNeeded`] if the stack is already
    /// converged on the submitted template and parameters.
    ///
    /// [`ServiceError::NoUpdatesNeeded`]: crate::error::ServiceError::NoUpdatesNeeded
    async fn update(&self, request: &UpdateStackRequest) -> Result<()>;

    /// Submits a stack deletion.
    async fn delete(&self, name: &str) -> Result<()>;

    /// Polls the named stack until the in-flight operation reaches a terminal
    /// state, sleeping `poll_interval` between polls.
    ///
    /// Returns the final stack snapshot, or `None` when a delete completed by
    /// making the stack disappear. A terminal failure or rollback status is
    /// surfaced as [`StackherdError::OperationFailed`] naming the operation.
    /// A stack that vanishes mid create/update violates an engine invariant
    /// and is reported as an internal error.
    async fn wait_for_completion(
        &self,
        name: &str,
        operation: OperationKind,
        poll_interval: Duration,
    ) -> Result<Option<RemoteStack>> {
        loop {
            match self.describe(name).await? {
                None if operation == OperationKind::Delete => return Ok(None),
                None => {
                    return Err(StackherdError::internal(format!(
                        "stack '{name}' disappeared while waiting for {operation} to complete"
                    )));
                }
                Some(stack) => {
                    debug!(stack = %name, status = %stack.status, "Polled stack status");
                    if stack.status.is_terminal_failure() {
                        return Err(StackherdError::OperationFailed {
                            stack: name.to_string(),
                            operation,
                            status: stack.status,
                        });
                    }
                    if stack.status.is_complete() {
                        return Ok(Some(stack));
                    }
                }
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}
