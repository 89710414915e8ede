// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::redundant_clone)]     // Useless clones warning

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Stackherd
//!
//! Declarative, concurrent create/update/delete orchestration for AWS
//! CloudFormation stacks.
//!
//! ## Overview
//!
//! Stackherd converges each declared stack toward a target state (`present`
//! or `absent`) by issuing the necessary CloudFormation operation, polling
//! until it completes, and exposing the resulting output values through
//! lazily-blocking handles. Many stacks converge in parallel; outputs of one
//! stack can feed parameters of another, and a collection aggregates the
//! results across all of them.
//!
//! ## Architecture
//!
//! Each submitted [`StackDescriptor`] runs through an independent
//! convergence state machine:
//!
//! 1. **Normalize**: inline file templates, resolve deferred parameters
//! 2. **Wait until ready**: defer to any operation already in flight
//! 3. **Establish target state**: create, fall through to update, or delete
//! 4. **Wait for completion**: poll to a terminal status and classify it
//! 5. **Extract outputs**: cache the stack's outputs in the handle
//!
//! ## Modules
//!
//! - [`descriptor`]: declarative stack descriptors and service options
//! - [`cfn`]: the remote client boundary and the AWS SDK adapter
//! - [`retry`]: bounded exponential-backoff retry around remote calls
//! - [`engine`]: the per-stack convergence state machine
//! - [`outputs`]: lazily-resolved stack outputs
//! - [`handle`]: fire-and-forget handles over background runs
//! - [`collection`]: bulk waiting and result aggregation
//! - [`orchestrator`]: the shared context owning client, policies, handles
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use stackherd::{AwsCloudFormation, Orchestrator, ParamValue, StackDescriptor};
//!
//! # async fn example() {
//! let client = Arc::new(AwsCloudFormation::new("eu-west-1").await);
//! let orchestrator = Orchestrator::new(client);
//!
//! let net = orchestrator.submit(
//!     StackDescriptor::new("net", "eu-west-1")
//!         .with_template_body("file://templates/net.json")
//!         .with_parameter("Cidr", "10.0.0.0/16"),
//! );
//! let app = orchestrator.submit(
//!     StackDescriptor::new("app", "eu-west-1")
//!         .with_template_body("file://templates/app.json")
//!         .with_parameter("VpcId", ParamValue::output_of(net.outputs(), "VpcId")),
//! );
//!
//! let results = orchestrator.shutdown().await.results().await;
//! # let _ = (app, results);
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cfn;
pub mod collection;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod handle;
pub mod outputs;
pub mod retry;

pub mod orchestrator;

// ============================================================================
// Re-exports
// ============================================================================

pub use cfn::{
    AwsCloudFormation, CreateStackRequest, OperationKind, Parameter, RemoteStack,
    RemoteStackClient, StackStatus, UpdateStackRequest,
};
pub use collection::StackCollection;
pub use descriptor::{
    CreateOptions, ParamValue, StackDescriptor, TargetState, TemplateSource, UpdateOptions,
};
pub use engine::{ConvergenceEngine, DEFAULT_POLL_INTERVAL};
pub use error::{ConfigError, Result, ServiceError, StackherdError};
pub use handle::StackHandle;
pub use orchestrator::Orchestrator;
pub use outputs::{OutputMap, StackOutputs, StackResult};
pub use retry::{RetryPolicy, RetryingClient};
