//! Error types for the stackherd orchestration system.
//!
//! The hierarchy separates fatal configuration problems (never retried) from
//! classified remote-service failures (some retried, some expected and handled
//! inline) and terminal stack-operation failures.
//!
//! Every error type is `Clone`: a convergence run resolves exactly once, and the
//! captured terminal error must be re-surfaced to every reader of the stack's
//! outputs, every time.

use std::path::PathBuf;
use thiserror::Error;

use crate::cfn::{OperationKind, StackStatus};

/// The main error type for stackherd operations.
#[derive(Debug, Clone, Error)]
pub enum StackherdError {
    /// Configuration-related errors. Fatal; never retried and never sent to
    /// the remote service.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Classified CloudFormation service errors.
    #[error("CloudFormation service error: {0}")]
    Service(#[from] ServiceError),

    /// The remote service reported a terminal failure or rollback status for
    /// the in-flight stack operation.
    #[error("Stack operation {operation} failed for stack '{stack}' (status: {status})")]
    OperationFailed {
        /// Name of the stack the operation targeted.
        stack: String,
        /// The operation that failed.
        operation: OperationKind,
        /// The terminal status the stack landed in.
        status: StackStatus,
    },

    /// An invariant assumed by the engine was violated.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The descriptor's target state is not one of the recognized values.
    #[error("Invalid target state: {value:?} (expected 'present' or 'absent')")]
    InvalidTargetState {
        /// The unrecognized target state string.
        value: String,
    },

    /// A local template file could not be read.
    #[error("Failed to read template file {path}: {message}")]
    TemplateUnreadable {
        /// Path to the unreadable template file.
        path: PathBuf,
        /// Description of the read failure.
        message: String,
    },

    /// A deferred parameter value could not be resolved.
    #[error("Failed to resolve parameter '{parameter}': {message}")]
    ParameterResolution {
        /// Name of the parameter that failed to resolve.
        parameter: String,
        /// Description of the resolution failure.
        message: String,
    },

    /// A `present` target was declared without a template.
    #[error("Stack '{name}' targets 'present' but has no template")]
    MissingTemplate {
        /// Name of the stack missing a template.
        name: String,
    },

    /// The descriptor declares a region the client is not scoped to.
    #[error("Stack '{name}' declares region '{declared}' but the client is scoped to '{client}'")]
    RegionMismatch {
        /// Name of the misrouted stack.
        name: String,
        /// Region declared by the descriptor.
        declared: String,
        /// Region the client was constructed for.
        client: String,
    },
}

/// Classified CloudFormation service errors.
///
/// The classification drives the engine's control flow: [`Throttling`] is
/// retried with backoff, [`AlreadyExists`] redirects a create to an update,
/// [`NoUpdatesNeeded`] is treated as success, [`NotFound`] is mapped to stack
/// absence, and [`Api`] is propagated unchanged.
///
/// [`Throttling`]: ServiceError::Throttling
/// [`AlreadyExists`]: ServiceError::AlreadyExists
/// [`NoUpdatesNeeded`]: ServiceError::NoUpdatesNeeded
/// [`NotFound`]: ServiceError::NotFound
/// [`Api`]: ServiceError::Api
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// The service throttled the request.
    #[error("Request throttled: {message}")]
    Throttling {
        /// Throttling detail from the service.
        message: String,
    },

    /// A stack with this name already exists.
    #[error("Stack already exists: {name}")]
    AlreadyExists {
        /// Name of the existing stack.
        name: String,
    },

    /// The submitted update would not change anything.
    #[error("No updates are to be performed on stack: {name}")]
    NoUpdatesNeeded {
        /// Name of the already-converged stack.
        name: String,
    },

    /// The named stack does not exist.
    #[error("Stack not found: {name}")]
    NotFound {
        /// Name of the missing stack.
        name: String,
    },

    /// Any other service failure, surfaced unchanged.
    #[error("CloudFormation API error ({}): {message}", code.as_deref().unwrap_or("unknown"))]
    Api {
        /// Service error code, when one was reported.
        code: Option<String>,
        /// Error message from the service.
        message: String,
    },
}

/// Result type alias for stackherd operations.
pub type Result<T> = std::result::Result<T, StackherdError>;

impl StackherdError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is transient and worth retrying.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Service(ServiceError::Throttling { .. }))
    }
}

impl ConfigError {
    /// Creates a template read error for the given path.
    #[must_use]
    pub fn template_unreadable(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::TemplateUnreadable {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a parameter resolution error.
    #[must_use]
    pub fn parameter_resolution(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParameterResolution {
            parameter: parameter.into(),
            message: message.into(),
        }
    }
}

impl ServiceError {
    /// Creates a throttling error.
    #[must_use]
    pub fn throttling(message: impl Into<String>) -> Self {
        Self::Throttling {
            message: message.into(),
        }
    }

    /// Creates a generic API error.
    #[must_use]
    pub fn api(code: Option<String>, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            message: message.into(),
        }
    }
}
