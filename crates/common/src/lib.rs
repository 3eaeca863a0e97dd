//! Cloud plumbing shared by the dynamic string service harness and tooling.

#![warn(clippy::pedantic)]

/// Module for common error types
pub mod error;

/// Module for process-boundary configuration (region, emulation mode)
pub mod config;

/// Module for resolving AWS client configuration
pub mod aws;

/// Module for the SSM parameter store client
pub mod param_store;

/// Module for direct Lambda invocation
pub mod invoke;

/// Module for driving the `terraform` CLI
pub mod terraform;
