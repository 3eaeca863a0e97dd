//! Environment Integration Test Suite
//!
//! This crate drives end-to-end scenarios against the dynamic string service:
//! a function that renders a value read from the SSM parameter store. Each
//! scenario provisions its own stack with terraform, checks the initial value
//! is served, updates the parameter, waits for the new value to propagate and
//! destroys the stack again.
//!
//! # Modes
//!
//! - Remote (default): observations are HTTP reads against the API ingress.
//! - Local emulation (`LOCALSTACK=1`): every AWS call goes to LocalStack
//!   (`LOCALSTACK_ENDPOINT`, default `http://localhost:4566`) and observations
//!   are direct function invocations.
//!
//! # Features
//!
//! - `live`: Scenarios against real infrastructure (minutes per scenario)
//!
//! # Prerequisites
//!
//! 1. `terraform` in PATH (or `DSS_TERRAFORM_BINARY`)
//! 2. AWS credentials resolvable by the default provider chain
//! 3. For local emulation: LocalStack running
//!
//! # Usage
//!
//! ```bash
//! # Offline harness tests only (mocks, no infrastructure)
//! cargo test -p env-tests
//!
//! # Live scenarios against AWS
//! cargo test -p env-tests --features live
//!
//! # Live scenarios against LocalStack
//! LOCALSTACK=1 cargo test -p env-tests --features live
//! ```

pub mod config;
pub mod environment;
pub mod error;
pub mod eventual;
pub mod fixtures;
pub mod namespace;
pub mod observe;
pub mod provision;
pub mod scenario;
