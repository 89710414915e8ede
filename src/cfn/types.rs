//! CloudFormation boundary types.
//!
//! This module defines the data structures exchanged with the remote
//! CloudFormation service: stack snapshots, the closed status vocabulary, and
//! the typed create/update requests submitted by the convergence engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::descriptor::{CreateOptions, UpdateOptions};

/// A stack status string from the service's closed vocabulary
/// (`*_IN_PROGRESS`, `*_COMPLETE`, `*_FAILED`, `ROLLBACK_COMPLETE`, ...).
///
/// The service owns the vocabulary; this type only classifies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackStatus(String);

impl StackStatus {
    /// Returns the raw status string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if a stack operation is currently in flight.
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.0.ends_with("_IN_PROGRESS")
    }

    /// Returns true if the last stack operation completed.
    ///
    /// Note that `ROLLBACK_COMPLETE` also ends in `_COMPLETE`; callers must
    /// check [`Self::is_terminal_failure`] first.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.0.ends_with("_COMPLETE")
    }

    /// Returns true if the status is a terminal failure for the operation
    /// that produced it: an outright `*_FAILED`, or any rollback status.
    #[must_use]
    pub fn is_terminal_failure(&self) -> bool {
        self.0.ends_with("_FAILED") || self.0.contains("ROLLBACK")
    }
}

impl From<&str> for StackStatus {
    fn from(status: &str) -> Self {
        Self(status.to_string())
    }
}

impl From<String> for StackStatus {
    fn from(status: String) -> Self {
        Self(status)
    }
}

impl std::fmt::Display for StackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of stack operation the engine performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    /// The stack was created.
    Create,
    /// The stack was updated.
    Update,
    /// The stack was deleted.
    Delete,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        };
        write!(f, "{kind}")
    }
}

/// Snapshot of a remote stack as returned by describe.
///
/// Owned by the remote service; the engine only reads and classifies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStack {
    /// Stack name.
    pub name: String,
    /// Current stack status.
    pub status: StackStatus,
    /// Output key/value pairs. Present only on certain statuses; empty
    /// otherwise.
    pub outputs: BTreeMap<String, String>,
}

/// A single resolved template parameter, ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Parameter name.
    pub key: String,
    /// Stringified parameter value.
    pub value: String,
    /// Whether the service should keep the previously submitted value.
    /// Always `false`: the engine always submits current values.
    pub use_previous_value: bool,
}

impl Parameter {
    /// Creates a parameter carrying the current value.
    #[must_use]
    pub fn current(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            use_previous_value: false,
        }
    }
}

/// Request to create a stack.
#[derive(Debug, Clone)]
pub struct CreateStackRequest {
    /// Stack name.
    pub name: String,
    /// Inline template body.
    pub template_body: String,
    /// Resolved parameters, in descriptor order.
    pub parameters: Vec<Parameter>,
    /// Create-only service options.
    pub options: CreateOptions,
}

/// Request to update a stack.
#[derive(Debug, Clone)]
pub struct UpdateStackRequest {
    /// Stack name.
    pub name: String,
    /// Inline template body.
    pub template_body: String,
    /// Resolved parameters, in descriptor order.
    pub parameters: Vec<Parameter>,
    /// Update-only service options.
    pub options: UpdateOptions,
}
