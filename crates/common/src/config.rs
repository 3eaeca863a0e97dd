//! Process-boundary configuration for reaching AWS.
//!
//! The harness and the CLI are pointed either at the real control plane or at
//! a local emulator (LocalStack). The choice is made once, from environment
//! variables, and carried around as an explicit [`AwsSettings`] value.

use crate::error::ConfigError;
use std::collections::HashMap;
use std::env;

/// Region used when `DSS_AWS_REGION` is not set.
pub const DEFAULT_REGION: &str = "eu-west-2";

/// Emulator endpoint used when `LOCALSTACK_ENDPOINT` is not set.
pub const DEFAULT_EMULATOR_ENDPOINT: &str = "http://localhost:4566";

/// `"1"` switches every client to the local emulator.
pub const LOCAL_EMULATION_VAR: &str = "LOCALSTACK";

/// Optional override of the emulator endpoint.
pub const EMULATOR_ENDPOINT_VAR: &str = "LOCALSTACK_ENDPOINT";

/// Region every client is bound to.
pub const REGION_VAR: &str = "DSS_AWS_REGION";

/// Where service calls are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The real AWS control plane.
    Remote,
    /// A local emulator; every service call is redirected to `endpoint`.
    LocalEmulation { endpoint: String },
}

impl Target {
    /// Whether calls are redirected to an emulator.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Target::LocalEmulation { .. })
    }

    /// Endpoint override, if any.
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Target::Remote => None,
            Target::LocalEmulation { endpoint } => Some(endpoint),
        }
    }
}

/// Region and target for all AWS clients built by this workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsSettings {
    pub region: String,
    pub target: Target,
}

impl AwsSettings {
    /// Settings for the real control plane.
    #[must_use]
    pub fn remote(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            target: Target::Remote,
        }
    }

    /// Settings for a local emulator at `endpoint`.
    #[must_use]
    pub fn local(region: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            target: Target::LocalEmulation {
                endpoint: endpoint.into(),
            },
        }
    }

    /// Load settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the region is blank or the emulator endpoint is not a URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load settings from a `HashMap` (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the region is blank or the emulator endpoint is not a URL.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let region = match non_empty(vars, REGION_VAR) {
            Some(region) if region.trim().is_empty() => {
                return Err(ConfigError::InvalidValue {
                    var: REGION_VAR.to_string(),
                    value: region.to_string(),
                    reason: "region must not be blank".to_string(),
                });
            }
            Some(region) => region.to_string(),
            None => DEFAULT_REGION.to_string(),
        };

        let use_local = vars.get(LOCAL_EMULATION_VAR).is_some_and(|v| v == "1");
        if !use_local {
            return Ok(Self::remote(region));
        }

        let endpoint = non_empty(vars, EMULATOR_ENDPOINT_VAR).unwrap_or(DEFAULT_EMULATOR_ENDPOINT);
        let endpoint = parse_endpoint(EMULATOR_ENDPOINT_VAR, endpoint)?;

        Ok(Self::local(region, endpoint))
    }
}

/// Look up a variable, treating an empty string as unset.
fn non_empty<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

/// Validate that `value` is an absolute http(s) URL.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` naming `var` when the value is not usable.
pub fn parse_endpoint(var: &str, value: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        var: var.to_string(),
        value: value.to_string(),
        reason,
    };

    let url = reqwest::Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }

    Ok(value.trim_end_matches('/').to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_to_remote_in_default_region() {
        let settings = AwsSettings::from_vars(&HashMap::new()).unwrap();
        assert_eq!(settings, AwsSettings::remote(DEFAULT_REGION));
        assert!(!settings.target.is_local());
        assert_eq!(settings.target.endpoint(), None);
    }

    #[test]
    fn test_localstack_flag_uses_default_endpoint() {
        let settings = AwsSettings::from_vars(&vars(&[("LOCALSTACK", "1")])).unwrap();
        assert_eq!(
            settings.target,
            Target::LocalEmulation {
                endpoint: DEFAULT_EMULATOR_ENDPOINT.to_string()
            }
        );
    }

    #[test]
    fn test_localstack_endpoint_override() {
        let settings = AwsSettings::from_vars(&vars(&[
            ("LOCALSTACK", "1"),
            ("LOCALSTACK_ENDPOINT", "http://emulator:4566/"),
        ]))
        .unwrap();
        assert_eq!(settings.target.endpoint(), Some("http://emulator:4566"));
    }

    #[test]
    fn test_empty_endpoint_falls_back_to_default() {
        let settings = AwsSettings::from_vars(&vars(&[
            ("LOCALSTACK", "1"),
            ("LOCALSTACK_ENDPOINT", ""),
        ]))
        .unwrap();
        assert_eq!(settings.target.endpoint(), Some(DEFAULT_EMULATOR_ENDPOINT));
    }

    #[test]
    fn test_endpoint_ignored_without_flag() {
        let settings = AwsSettings::from_vars(&vars(&[
            ("LOCALSTACK", "0"),
            ("LOCALSTACK_ENDPOINT", "http://emulator:4566"),
        ]))
        .unwrap();
        assert_eq!(settings.target, Target::Remote);
    }

    #[test]
    fn test_region_override() {
        let settings = AwsSettings::from_vars(&vars(&[("DSS_AWS_REGION", "us-east-1")])).unwrap();
        assert_eq!(settings.region, "us-east-1");
    }

    #[test]
    fn test_blank_region_rejected() {
        let result = AwsSettings::from_vars(&vars(&[("DSS_AWS_REGION", "   ")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { var, .. }) if var == REGION_VAR));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let result = AwsSettings::from_vars(&vars(&[
            ("LOCALSTACK", "1"),
            ("LOCALSTACK_ENDPOINT", "not a url"),
        ]));
        assert!(
            matches!(result, Err(ConfigError::InvalidValue { var, .. }) if var == EMULATOR_ENDPOINT_VAR)
        );
    }

    #[test]
    fn test_non_http_endpoint_rejected() {
        let result = parse_endpoint("X", "ftp://localhost:4566");
        assert!(result.is_err());
    }
}
