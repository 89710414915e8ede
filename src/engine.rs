//! Per-stack convergence engine.
//!
//! This module implements the state machine that drives one stack from its
//! current remote state to the descriptor's target state: decide create vs.
//! update vs. delete, submit the operation, poll to a terminal status, and
//! extract output values on success.
//!
//! Within one run the steps are strictly sequential: normalize, wait until no
//! foreign operation is in flight, establish the target state, wait for the
//! submitted operation to complete, extract outputs. All remote traffic goes
//! through the retrying client.

use std::time::Duration;

use tracing::{debug, info};

use crate::cfn::{
    CreateStackRequest, OperationKind, Parameter, RemoteStackClient, UpdateStackRequest,
};
use crate::descriptor::{
    CreateOptions, ParamValue, StackDescriptor, TargetState, TemplateSource, UpdateOptions,
};
use crate::error::{ConfigError, Result, StackherdError};
use crate::outputs::OutputMap;
use crate::retry::RetryingClient;

/// Default time between stack status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// The per-stack convergence state machine.
#[derive(Debug)]
pub struct ConvergenceEngine {
    /// Retry-wrapped remote client; the engine never talks to the service
    /// directly.
    client: RetryingClient,
    /// Time between stack status polls.
    poll_interval: Duration,
}

/// A descriptor normalized for submission: template inlined, parameters
/// resolved and stringified.
#[derive(Debug)]
enum Prepared {
    /// The stack should exist; carries everything both create and update
    /// need.
    Present {
        /// Stack name.
        name: String,
        /// Inlined template body.
        template_body: String,
        /// Resolved parameters, in descriptor order.
        parameters: Vec<Parameter>,
        /// Create-only options.
        create_options: CreateOptions,
        /// Update-only options.
        update_options: UpdateOptions,
    },
    /// The stack should not exist.
    Absent {
        /// Stack name.
        name: String,
    },
}

impl Prepared {
    const fn name(&self) -> &String {
        match self {
            Self::Present { name, .. } | Self::Absent { name } => name,
        }
    }
}

impl ConvergenceEngine {
    /// Creates an engine with the default poll interval.
    #[must_use]
    pub const fn new(client: RetryingClient) -> Self {
        Self {
            client,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets the time between stack status polls.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Runs the entire convergence lifecycle for one stack.
    ///
    /// Returns the stack's output map on success (empty after a delete).
    ///
    /// # Errors
    ///
    /// Fails with a [`ConfigError`] before any remote call when the
    /// descriptor cannot be normalized, with a service error when a remote
    /// operation fails permanently, or with
    /// [`StackherdError::OperationFailed`] when the stack lands in a terminal
    /// failure status.
    pub async fn run(&self, descriptor: StackDescriptor) -> Result<OutputMap> {
        info!(
            stack = %descriptor.name,
            target = %descriptor.target_state,
            region = %descriptor.region,
            "Starting convergence"
        );

        self.check_region(&descriptor)?;
        let prepared = Self::prepare(descriptor).await?;
        let name = prepared.name().clone();

        self.wait_until_ready(&name).await?;

        let operation = self.establish_target_state(&prepared).await?;

        let stack = self
            .client
            .wait_for_completion(&name, operation, self.poll_interval)
            .await?;

        let outputs = match (operation, stack) {
            (OperationKind::Delete, _) | (_, None) => OutputMap::new(),
            (_, Some(stack)) => stack.outputs,
        };

        info!(
            stack = %name,
            %operation,
            output_count = outputs.len(),
            "Convergence complete"
        );
        Ok(outputs)
    }

    /// Rejects a descriptor declaring a region other than the one the
    /// client is scoped to. A region-agnostic client accepts any region.
    fn check_region(&self, descriptor: &StackDescriptor) -> Result<()> {
        match self.client.region() {
            Some(client_region) if client_region != descriptor.region => {
                Err(ConfigError::RegionMismatch {
                    name: descriptor.name.clone(),
                    declared: descriptor.region.clone(),
                    client: client_region.to_string(),
                }
                .into())
            }
            _ => Ok(()),
        }
    }

    /// Normalizes a descriptor: inlines a file template and resolves every
    /// parameter value to a string. Failures here are fatal and happen before
    /// any remote call.
    async fn prepare(descriptor: StackDescriptor) -> Result<Prepared> {
        let StackDescriptor {
            name,
            target_state,
            template,
            parameters,
            create_options,
            update_options,
            ..
        } = descriptor;

        if target_state == TargetState::Absent {
            return Ok(Prepared::Absent { name });
        }

        let template_body = match template {
            Some(TemplateSource::Inline(body)) => body,
            Some(TemplateSource::File(path)) => {
                tokio::fs::read_to_string(&path).await.map_err(|err| {
                    ConfigError::template_unreadable(&path, err.to_string())
                })?
            }
            None => return Err(ConfigError::MissingTemplate { name }.into()),
        };

        let mut resolved = Vec::with_capacity(parameters.len());
        for (key, value) in parameters {
            let value = match value {
                ParamValue::Literal(value) => value,
                ParamValue::OutputOf { outputs, key: output_key } => {
                    debug!(
                        stack = %name,
                        parameter = %key,
                        upstream = %outputs.stack_name(),
                        output = %output_key,
                        "Resolving deferred parameter"
                    );
                    outputs
                        .get(&output_key)
                        .await
                        .map_err(|err| ConfigError::parameter_resolution(&key, err.to_string()))?
                        .ok_or_else(|| {
                            ConfigError::parameter_resolution(
                                &key,
                                format!(
                                    "stack '{}' has no output '{output_key}'",
                                    outputs.stack_name()
                                ),
                            )
                        })?
                }
            };
            resolved.push(Parameter::current(key, value));
        }

        Ok(Prepared::Present {
            name,
            template_body,
            parameters: resolved,
            create_options,
            update_options,
        })
    }

    /// Polls until no stack operation is in progress, guarding against
    /// racing a change already in flight on the same name.
    async fn wait_until_ready(&self, name: &str) -> Result<()> {
        loop {
            match self.client.describe(name).await? {
                Some(stack) if stack.status.is_in_progress() => {
                    debug!(
                        stack = %name,
                        status = %stack.status,
                        "Operation in progress; waiting before proceeding"
                    );
                    tokio::time::sleep(self.poll_interval).await;
                }
                _ => return Ok(()),
            }
        }
    }

    /// Submits the operation that establishes the target state and reports
    /// which kind was ultimately performed.
    async fn establish_target_state(&self, prepared: &Prepared) -> Result<OperationKind> {
        match prepared {
            Prepared::Present {
                name,
                template_body,
                parameters,
                create_options,
                update_options,
            } => {
                let request = CreateStackRequest {
                    name: name.clone(),
                    template_body: template_body.clone(),
                    parameters: parameters.clone(),
                    options: create_options.clone(),
                };

                match self.client.create(&request).await {
                    Ok(()) => {
                        info!(stack = %name, "Stack creation submitted");
                        Ok(OperationKind::Create)
                    }
                    Err(err) if Self::is_already_exists(&err) => {
                        debug!(stack = %name, "Stack already exists; updating instead");
                        // Let any operation the create collided with settle
                        // before submitting the update.
                        self.wait_until_ready(name).await?;
                        self.update_existing(name, template_body, parameters, update_options)
                            .await
                    }
                    Err(err) => Err(err),
                }
            }
            Prepared::Absent { name } => {
                if self.client.describe(name).await?.is_some() {
                    self.client.delete(name).await?;
                    info!(stack = %name, "Stack deletion submitted");
                } else {
                    debug!(stack = %name, "Stack already absent; nothing to delete");
                }
                Ok(OperationKind::Delete)
            }
        }
    }

    /// Submits an update, treating "no updates to perform" as success.
    async fn update_existing(
        &self,
        name: &str,
        template_body: &str,
        parameters: &[Parameter],
        options: &UpdateOptions,
    ) -> Result<OperationKind> {
        let request = UpdateStackRequest {
            name: name.to_string(),
            template_body: template_body.to_string(),
            parameters: parameters.to_vec(),
            options: options.clone(),
        };

        match self.client.update(&request).await {
            Ok(()) => {
                info!(stack = %name, "Stack update submitted");
                Ok(OperationKind::Update)
            }
            Err(err) if Self::is_no_updates(&err) => {
                info!(stack = %name, "Stack already converged; no updates to perform");
                Ok(OperationKind::Update)
            }
            Err(err) => Err(err),
        }
    }

    const fn is_already_exists(err: &StackherdError) -> bool {
        matches!(
            err,
            StackherdError::Service(crate::error::ServiceError::AlreadyExists { .. })
        )
    }

    const fn is_no_updates(err: &StackherdError) -> bool {
        matches!(
            err,
            StackherdError::Service(crate::error::ServiceError::NoUpdatesNeeded { .. })
        )
    }
}
