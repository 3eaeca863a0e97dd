//! Common error types for the dynamic string service tooling.

use thiserror::Error;

/// Errors raised while reading process-boundary configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was present but could not be interpreted
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    InvalidValue {
        var: String,
        value: String,
        reason: String,
    },
}

/// Errors raised by the cloud collaborators (SDK clients and the terraform CLI).
#[derive(Error, Debug)]
pub enum CloudError {
    /// Credentials or region could not be resolved
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Parameter store write failed
    #[error("Parameter store error for {path}: {message}")]
    Store { path: String, message: String },

    /// Direct function invocation failed
    #[error("Invoke error for {function}: {message}")]
    Invoke { function: String, message: String },

    /// A terraform command exited unsuccessfully or could not be spawned
    #[error("terraform {command} failed: {message}")]
    Terraform { command: String, message: String },
}

/// Result type alias using `CloudError`
pub type Result<T> = std::result::Result<T, CloudError>;
