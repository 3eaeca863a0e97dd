//! Observation of the service's externally visible output.
//!
//! What counts as a match is decided here, once, from the configuration
//! value. How the output is obtained (HTTP read or direct invocation) is an
//! [`ObservationStrategy`] chosen when the environment is resolved.

use async_trait::async_trait;
use thiserror::Error;

/// The fragment the service renders around the configured value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedObservation {
    fragment: String,
}

impl ExpectedObservation {
    /// Expected output for a given configuration value.
    pub fn for_value(value: &str) -> Self {
        Self {
            fragment: format!("<h1>The saved string is {value}</h1>"),
        }
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Whether an observed body contains the expected fragment.
    pub fn matches(&self, body: &str) -> bool {
        body.contains(&self.fragment)
    }
}

/// A failed observation. Always retryable from the verifier's point of view.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ObserveError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected status {status}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("invocation failed: {0}")]
    Invoke(String),
}

/// A bound source of observations (one URL, one function).
#[async_trait]
pub trait Observer: Send + Sync {
    /// Human-readable description of what is observed, for logs.
    fn describe(&self) -> String;

    /// Take one observation of the service output.
    async fn observe(&self) -> Result<String, ObserveError>;
}

/// How observations are obtained in the current environment.
pub trait ObservationStrategy: Send + Sync {
    /// Short name for logs (`remote-http`, `local-invoke`).
    fn name(&self) -> &'static str;

    /// Stack output that identifies the observation target.
    fn required_output(&self) -> &'static str;

    /// Bind the strategy to the target read from the stack outputs.
    fn bind(&self, target: String) -> Box<dyn Observer>;
}
