//! Stack descriptor types.
//!
//! A [`StackDescriptor`] is the declarative input to a convergence run: the
//! stack's name and region, the state it should end up in, the template and
//! parameters to converge it with, and the service options forwarded to the
//! create or update call. Descriptors are immutable once submitted.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::outputs::StackOutputs;

/// The desired end state of a stack.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetState {
    /// The stack should exist (created or updated as necessary).
    #[default]
    Present,
    /// The stack should not exist (deleted if present).
    Absent,
}

impl FromStr for TargetState {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "present" => Ok(Self::Present),
            "absent" => Ok(Self::Absent),
            other => Err(ConfigError::InvalidTargetState {
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for TargetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self {
            Self::Present => "present",
            Self::Absent => "absent",
        };
        write!(f, "{state}")
    }
}

/// Where the stack template comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// The template body itself.
    Inline(String),
    /// A local file to read the template body from.
    File(PathBuf),
}

impl TemplateSource {
    /// Prefix marking a template value as a local file reference.
    pub const FILE_PREFIX: &'static str = "file://";

    /// Parses a template value, treating it as a file reference when it
    /// starts with [`Self::FILE_PREFIX`].
    #[must_use]
    pub fn parse(value: &str) -> Self {
        value.strip_prefix(Self::FILE_PREFIX).map_or_else(
            || Self::Inline(value.to_string()),
            |path| Self::File(PathBuf::from(path)),
        )
    }
}

/// A parameter value, either known up front or deferred until another
/// stack's outputs resolve.
#[derive(Debug, Clone)]
pub enum ParamValue {
    /// A literal value, submitted as-is.
    Literal(String),
    /// The value of an output of another stack, resolved (blocking on that
    /// stack's convergence) just before submission.
    OutputOf {
        /// The upstream stack's output view.
        outputs: StackOutputs,
        /// The output key to read.
        key: String,
    },
}

impl ParamValue {
    /// Defers this parameter to an output of another stack.
    #[must_use]
    pub fn output_of(outputs: &StackOutputs, key: impl Into<String>) -> Self {
        Self::OutputOf {
            outputs: outputs.clone(),
            key: key.into(),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Literal(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Literal(value.to_string())
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        Self::Literal(value.to_string())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Literal(value.to_string())
    }
}

/// Service options forwarded only to stack creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CreateOptions {
    /// IAM capabilities to acknowledge (e.g. `CAPABILITY_IAM`).
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Tags to apply to the stack and its resources.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// SNS topic ARNs to notify about stack events.
    #[serde(default)]
    pub notification_arns: Vec<String>,
    /// Disable rollback of the stack if creation fails.
    #[serde(default)]
    pub disable_rollback: Option<bool>,
    /// Minutes before an unfinished creation times out.
    #[serde(default)]
    pub timeout_minutes: Option<i32>,
    /// What to do on creation failure (`DO_NOTHING`, `ROLLBACK`, `DELETE`).
    #[serde(default)]
    pub on_failure: Option<String>,
    /// Stack policy body.
    #[serde(default)]
    pub stack_policy_body: Option<String>,
}

/// Service options forwarded only to stack updates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct UpdateOptions {
    /// IAM capabilities to acknowledge (e.g. `CAPABILITY_IAM`).
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// SNS topic ARNs to notify about stack events.
    #[serde(default)]
    pub notification_arns: Vec<String>,
    /// Stack policy body to apply after the update.
    #[serde(default)]
    pub stack_policy_body: Option<String>,
    /// Temporary stack policy body applied during the update.
    #[serde(default)]
    pub stack_policy_during_update_body: Option<String>,
}

/// Declarative description of one stack's desired state.
#[derive(Debug, Clone)]
pub struct StackDescriptor {
    /// Stack name; the unique key within a region.
    pub name: String,
    /// AWS region the stack lives in.
    pub region: String,
    /// Desired end state.
    pub target_state: TargetState,
    /// Template source; required for a `present` target.
    pub template: Option<TemplateSource>,
    /// Template parameters, in submission order.
    pub parameters: Vec<(String, ParamValue)>,
    /// Options forwarded to stack creation.
    pub create_options: CreateOptions,
    /// Options forwarded to stack updates.
    pub update_options: UpdateOptions,
}

impl StackDescriptor {
    /// Creates a descriptor targeting `present` with no template or
    /// parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
            target_state: TargetState::default(),
            template: None,
            parameters: Vec::new(),
            create_options: CreateOptions::default(),
            update_options: UpdateOptions::default(),
        }
    }

    /// Sets the target state.
    #[must_use]
    pub const fn with_target_state(mut self, state: TargetState) -> Self {
        self.target_state = state;
        self
    }

    /// Sets the template source.
    #[must_use]
    pub fn with_template(mut self, template: TemplateSource) -> Self {
        self.template = Some(template);
        self
    }

    /// Sets the template from a string value, treating a `file://` prefix as
    /// a local file reference.
    #[must_use]
    pub fn with_template_body(mut self, body: &str) -> Self {
        self.template = Some(TemplateSource::parse(body));
        self
    }

    /// Appends a template parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.parameters.push((key.into(), value.into()));
        self
    }

    /// Sets the creation options.
    #[must_use]
    pub fn with_create_options(mut self, options: CreateOptions) -> Self {
        self.create_options = options;
        self
    }

    /// Sets the update options.
    #[must_use]
    pub fn with_update_options(mut self, options: UpdateOptions) -> Self {
        self.update_options = options;
        self
    }

    /// Acknowledges an IAM capability for both create and update.
    #[must_use]
    pub fn with_capability(mut self, capability: &str) -> Self {
        self.create_options.capabilities.push(capability.to_string());
        self.update_options.capabilities.push(capability.to_string());
        self
    }
}
