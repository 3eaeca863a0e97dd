//! Scenario error taxonomy.

use crate::eventual::VerificationTimeout;
use crate::namespace::Namespace;
use common::error::ConfigError;
use std::fmt;
use thiserror::Error;

/// Step of a scenario, for error context and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioStep {
    Configure,
    Provision,
    ReadOutputs,
    VerifyInitial,
    Mutate,
    VerifyUpdated,
    Teardown,
}

impl fmt::Display for ScenarioStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScenarioStep::Configure => "configure",
            ScenarioStep::Provision => "provision",
            ScenarioStep::ReadOutputs => "read-outputs",
            ScenarioStep::VerifyInitial => "verify-initial",
            ScenarioStep::Mutate => "mutate",
            ScenarioStep::VerifyUpdated => "verify-updated",
            ScenarioStep::Teardown => "teardown",
        };
        f.write_str(name)
    }
}

/// Scenario errors.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Credentials, region or process configuration unusable. Fatal before provisioning.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("[{namespace}] provisioning failed during {step}: {message}")]
    Provision {
        namespace: String,
        step: ScenarioStep,
        message: String,
    },

    #[error("[{namespace}] parameter store write to {path} failed: {message}")]
    Store {
        namespace: String,
        path: String,
        message: String,
    },

    #[error("[{namespace}] {step} did not converge: {timeout}")]
    VerificationTimeout {
        namespace: String,
        step: ScenarioStep,
        timeout: VerificationTimeout,
    },

    #[error("[{namespace}] teardown failed: {message}")]
    Destroy { namespace: String, message: String },
}

impl ScenarioError {
    /// Step the error was raised in.
    pub fn step(&self) -> ScenarioStep {
        match self {
            ScenarioError::Configuration(_) => ScenarioStep::Configure,
            ScenarioError::Provision { step, .. } => *step,
            ScenarioError::Store { .. } => ScenarioStep::Mutate,
            ScenarioError::VerificationTimeout { step, .. } => *step,
            ScenarioError::Destroy { .. } => ScenarioStep::Teardown,
        }
    }
}

impl From<ConfigError> for ScenarioError {
    fn from(e: ConfigError) -> Self {
        ScenarioError::Configuration(e.to_string())
    }
}

/// A failed scenario: the primary cause, plus a teardown error if cleanup
/// failed as well. The teardown error never replaces the primary cause.
#[derive(Debug)]
pub struct ScenarioFailure {
    pub namespace: Namespace,
    pub error: ScenarioError,
    pub teardown: Option<ScenarioError>,
}

impl fmt::Display for ScenarioFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(teardown) = &self.teardown {
            write!(f, " (additionally: {teardown})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ScenarioFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_display() {
        assert_eq!(ScenarioStep::VerifyUpdated.to_string(), "verify-updated");
        assert_eq!(ScenarioStep::ReadOutputs.to_string(), "read-outputs");
    }

    #[test]
    fn test_store_error_maps_to_mutate_step() {
        let err = ScenarioError::Store {
            namespace: "test-abc".to_string(),
            path: "/p".to_string(),
            message: "AccessDenied".to_string(),
        };
        assert_eq!(err.step(), ScenarioStep::Mutate);
        assert!(err.to_string().contains("[test-abc]"));
    }

    #[test]
    fn test_failure_display_keeps_primary_first() {
        let failure = ScenarioFailure {
            namespace: Namespace::from_run_id("p", "test", "abc"),
            error: ScenarioError::Provision {
                namespace: "test-abc".to_string(),
                step: ScenarioStep::Provision,
                message: "boom".to_string(),
            },
            teardown: Some(ScenarioError::Destroy {
                namespace: "test-abc".to_string(),
                message: "still boom".to_string(),
            }),
        };

        let rendered = failure.to_string();
        assert!(rendered.starts_with("[test-abc] provisioning failed"));
        assert!(rendered.contains("additionally: [test-abc] teardown failed: still boom"));
    }

    #[test]
    fn test_config_error_converts() {
        let err: ScenarioError = ConfigError::InvalidValue {
            var: "X".to_string(),
            value: "y".to_string(),
            reason: "bad".to_string(),
        }
        .into();
        assert_eq!(err.step(), ScenarioStep::Configure);
    }
}
