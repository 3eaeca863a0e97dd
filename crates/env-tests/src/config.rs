//! Harness configuration.
//!
//! Everything a scenario needs to know about its surroundings (region,
//! emulation mode, where the infrastructure lives, retry budgets) is loaded
//! here once and passed down explicitly.

use crate::eventual::{ConsistencyCategory, RetryPolicy};
use common::config::AwsSettings;
use common::error::ConfigError;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Project name used as the first parameter path component.
pub const DEFAULT_PROJECT_NAME: &str = "dynamic-string-service";

/// Provisioning tool executable used when `DSS_TERRAFORM_BINARY` is not set.
pub const DEFAULT_TERRAFORM_BINARY: &str = "terraform";

/// Configuration shared by every scenario in a test process.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub aws: AwsSettings,
    pub project_name: String,
    pub terraform_dir: PathBuf,
    pub terraform_binary: String,
    /// Budget for the first read after provisioning.
    pub cold_read: RetryPolicy,
    /// Budget for observing a parameter update.
    pub propagation: RetryPolicy,
}

impl HarnessConfig {
    /// Configuration with all defaults for the given AWS settings.
    pub fn new(aws: AwsSettings) -> Self {
        Self {
            aws,
            project_name: DEFAULT_PROJECT_NAME.to_string(),
            terraform_dir: default_terraform_dir(),
            terraform_binary: DEFAULT_TERRAFORM_BINARY.to_string(),
            cold_read: ConsistencyCategory::ColdRead.policy(),
            propagation: ConsistencyCategory::ConfigPropagation.policy(),
        }
    }

    /// Override both retry budgets.
    pub fn with_policies(mut self, cold_read: RetryPolicy, propagation: RetryPolicy) -> Self {
        self.cold_read = cold_read;
        self.propagation = propagation;
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::new(AwsSettings::from_vars(vars)?);

        if let Some(project) = lookup(vars, "DSS_PROJECT_NAME") {
            config.project_name = project.to_string();
        }
        if let Some(dir) = lookup(vars, "DSS_TERRAFORM_DIR") {
            config.terraform_dir = PathBuf::from(dir);
        }
        if let Some(binary) = lookup(vars, "DSS_TERRAFORM_BINARY") {
            config.terraform_binary = binary.to_string();
        }

        config.cold_read = RetryPolicy::new(
            parse_attempts(vars, "DSS_COLD_READ_ATTEMPTS", config.cold_read.max_attempts)?,
            parse_interval(vars, "DSS_COLD_READ_INTERVAL_SECS", config.cold_read.interval)?,
        );
        config.propagation = RetryPolicy::new(
            parse_attempts(vars, "DSS_PROPAGATION_ATTEMPTS", config.propagation.max_attempts)?,
            parse_interval(
                vars,
                "DSS_PROPAGATION_INTERVAL_SECS",
                config.propagation.interval,
            )?,
        );

        Ok(config)
    }
}

/// The infrastructure description sits at the repository root.
fn default_terraform_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn lookup<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

fn parse_attempts(
    vars: &HashMap<String, String>,
    key: &str,
    default: u32,
) -> Result<u32, ConfigError> {
    let Some(raw) = lookup(vars, key) else {
        return Ok(default);
    };

    match raw.parse::<u32>() {
        Ok(0) => Err(invalid(key, raw, "must be at least 1")),
        Ok(n) => Ok(n),
        Err(e) => Err(invalid(key, raw, &e.to_string())),
    }
}

fn parse_interval(
    vars: &HashMap<String, String>,
    key: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let Some(raw) = lookup(vars, key) else {
        return Ok(default);
    };

    raw.parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| invalid(key, raw, &e.to_string()))
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        var: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
