//! CloudFormation boundary module.
//!
//! Defines the abstract remote stack client the convergence engine depends
//! on, the data types crossing that boundary, and the AWS SDK adapter.

mod aws;
mod client;
mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use aws::AwsCloudFormation;
pub use client::RemoteStackClient;
pub use types::{
    CreateStackRequest, OperationKind, Parameter, RemoteStack, StackStatus, UpdateStackRequest,
};
