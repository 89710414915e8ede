//! AWS CloudFormation client adapter.
//!
//! Implements [`RemoteStackClient`] over the AWS SDK, translating SDK errors
//! into the crate's service-error classification. One adapter is scoped to
//! one region, matching the per-region session of the orchestration layer.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_cloudformation::Client;
use aws_sdk_cloudformation::config::Region;
use aws_sdk_cloudformation::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_cloudformation::operation::create_stack::CreateStackError;
use aws_sdk_cloudformation::types::{Capability, OnFailure, Parameter as AwsParameter, Tag};
use tracing::debug;

use super::client::RemoteStackClient;
use super::types::{CreateStackRequest, Parameter, RemoteStack, StackStatus, UpdateStackRequest};
use crate::error::{Result, ServiceError, StackherdError};

/// Service error codes that indicate throttling.
const THROTTLING_CODES: [&str; 3] = ["Throttling", "ThrottlingException", "RequestLimitExceeded"];

/// Message fragment CloudFormation uses for a no-op update.
const NO_UPDATES_MESSAGE: &str = "No updates are to be performed";

/// Message fragment CloudFormation uses for a missing stack.
const DOES_NOT_EXIST_MESSAGE: &str = "does not exist";

/// CloudFormation-backed remote stack client.
#[derive(Debug, Clone)]
pub struct AwsCloudFormation {
    client: Client,
    region: Option<String>,
}

impl AwsCloudFormation {
    /// Creates a client for the given region using the ambient AWS
    /// credential chain.
    pub async fn new(region: impl Into<String>) -> Self {
        let region = region.into();
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .load()
            .await;
        Self {
            client: Client::new(&config),
            region: Some(region),
        }
    }

    /// Wraps an already-configured SDK client, adopting its region.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        let region = client.config().region().map(ToString::to_string);
        Self { client, region }
    }
}

/// Extracts the service error code, if the request reached the service.
fn error_code<E>(err: &SdkError<E>) -> Option<&str>
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    err.as_service_error().and_then(ProvideErrorMetadata::code)
}

/// Extracts the service error message, if the request reached the service.
fn error_message<E>(err: &SdkError<E>) -> Option<&str>
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    err.as_service_error()
        .and_then(ProvideErrorMetadata::message)
}

/// Maps an SDK error into the crate's classification.
fn classify<E>(err: &SdkError<E>) -> StackherdError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let code = error_code(err).map(str::to_string);
    let message = error_message(err).map_or_else(|| err.to_string(), str::to_string);

    if code
        .as_deref()
        .is_some_and(|c| THROTTLING_CODES.contains(&c))
    {
        return ServiceError::throttling(message).into();
    }

    ServiceError::api(code, message).into()
}

/// True when the error is CloudFormation's "stack does not exist" validation
/// failure, which is not modeled as a distinct SDK error type.
fn is_missing_stack<E>(err: &SdkError<E>) -> bool
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    error_code(err) == Some("ValidationError")
        && error_message(err).is_some_and(|m| m.contains(DOES_NOT_EXIST_MESSAGE))
}

/// Converts resolved parameters into SDK parameter structures.
fn to_aws_parameters(parameters: &[Parameter]) -> Vec<AwsParameter> {
    parameters
        .iter()
        .map(|p| {
            AwsParameter::builder()
                .parameter_key(&p.key)
                .parameter_value(&p.value)
                .use_previous_value(p.use_previous_value)
                .build()
        })
        .collect()
}

#[async_trait]
impl RemoteStackClient for AwsCloudFormation {
    fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    async fn describe(&self, name: &str) -> Result<Option<RemoteStack>> {
        let output = match self.client.describe_stacks().stack_name(name).send().await {
            Ok(output) => output,
            Err(err) if is_missing_stack(&err) => return Ok(None),
            Err(err) => return Err(classify(&err)),
        };

        let Some(stack) = output.stacks().first() else {
            return Ok(None);
        };

        let status = stack
            .stack_status()
            .map(aws_sdk_cloudformation::types::StackStatus::as_str)
            .unwrap_or_default();

        let outputs = stack
            .outputs()
            .iter()
            .filter_map(|o| Some((o.output_key()?.to_string(), o.output_value()?.to_string())))
            .collect();

        Ok(Some(RemoteStack {
            name: stack.stack_name().unwrap_or(name).to_string(),
            status: StackStatus::from(status),
            outputs,
        }))
    }

    async fn create(&self, request: &CreateStackRequest) -> Result<()> {
        debug!(stack = %request.name, "Submitting stack creation");

        let mut builder = self
            .client
            .create_stack()
            .stack_name(&request.name)
            .template_body(&request.template_body)
            .set_parameters(Some(to_aws_parameters(&request.parameters)));

        for capability in &request.options.capabilities {
            builder = builder.capabilities(Capability::from(capability.as_str()));
        }
        for (key, value) in &request.options.tags {
            let tag = Tag::builder().key(key).value(value).build();
            builder = builder.tags(tag);
        }
        for arn in &request.options.notification_arns {
            builder = builder.notification_arns(arn);
        }
        if let Some(disable) = request.options.disable_rollback {
            builder = builder.disable_rollback(disable);
        }
        if let Some(minutes) = request.options.timeout_minutes {
            builder = builder.timeout_in_minutes(minutes);
        }
        if let Some(on_failure) = &request.options.on_failure {
            builder = builder.on_failure(OnFailure::from(on_failure.as_str()));
        }
        if let Some(policy) = &request.options.stack_policy_body {
            builder = builder.stack_policy_body(policy);
        }

        builder.send().await.map(|_| ()).map_err(|err| {
            if err
                .as_service_error()
                .is_some_and(CreateStackError::is_already_exists_exception)
            {
                StackherdError::Service(ServiceError::AlreadyExists {
                    name: request.name.clone(),
                })
            } else {
                classify(&err)
            }
        })
    }

    async fn update(&self, request: &UpdateStackRequest) -> Result<()> {
        debug!(stack = %request.name, "Submitting stack update");

        let mut builder = self
            .client
            .update_stack()
            .stack_name(&request.name)
            .template_body(&request.template_body)
            .set_parameters(Some(to_aws_parameters(&request.parameters)));

        for capability in &request.options.capabilities {
            builder = builder.capabilities(Capability::from(capability.as_str()));
        }
        for arn in &request.options.notification_arns {
            builder = builder.notification_arns(arn);
        }
        if let Some(policy) = &request.options.stack_policy_body {
            builder = builder.stack_policy_body(policy);
        }
        if let Some(policy) = &request.options.stack_policy_during_update_body {
            builder = builder.stack_policy_during_update_body(policy);
        }

        builder.send().await.map(|_| ()).map_err(|err| {
            if error_code(&err) == Some("ValidationError")
                && error_message(&err).is_some_and(|m| m.contains(NO_UPDATES_MESSAGE))
            {
                StackherdError::Service(ServiceError::NoUpdatesNeeded {
                    name: request.name.clone(),
                })
            } else if is_missing_stack(&err) {
                StackherdError::Service(ServiceError::NotFound {
                    name: request.name.clone(),
                })
            } else {
                classify(&err)
            }
        })
    }

    async fn delete(&self, name: &str) -> Result<()> {
        debug!(stack = %name, "Submitting stack deletion");

        self.client
            .delete_stack()
            .stack_name(name)
            .send()
            .await
            .map(|_| ())
            .map_err(|err| classify(&err))
    }
}
