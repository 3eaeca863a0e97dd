//! `update-dynamic-string`: write a new value to the dynamic string parameter.
//!
//! The parameter name comes from `--param-name` or, failing that, from the
//! `ssm_parameter_name` output of the deployed stack. Exit status is 2 when
//! no name can be determined and 1 when the write fails.

#![warn(clippy::pedantic)]

use anyhow::Context;
use clap::Parser;
use common::aws::load_sdk_config;
use common::config::{parse_endpoint, AwsSettings, Target};
use common::error::ConfigError;
use common::param_store::{ParameterAck, ParameterStore, SsmParameterStore};
use common::terraform::Terraform;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Exit status when no parameter name can be determined.
const EXIT_NO_PARAMETER: u8 = 2;

/// Exit status when the write is rejected or cannot be attempted.
const EXIT_WRITE_FAILED: u8 = 1;

/// Stack output naming the parameter.
const PARAMETER_NAME_OUTPUT: &str = "ssm_parameter_name";

#[derive(Debug, Parser)]
#[command(
    name = "update-dynamic-string",
    about = "Update the dynamic string in SSM Parameter Store"
)]
struct Cli {
    /// New value for the dynamic string
    value: String,

    /// SSM parameter name. If omitted, read from the terraform output
    #[arg(long)]
    param_name: Option<String>,

    /// AWS region (defaults to DSS_AWS_REGION, then eu-west-2)
    #[arg(long)]
    region: Option<String>,

    /// Send the write to this endpoint instead of AWS (e.g. LocalStack)
    #[arg(long)]
    endpoint_url: Option<String>,

    /// Directory holding the terraform configuration
    #[arg(long, env = "DSS_TERRAFORM_DIR", default_value = ".")]
    terraform_dir: PathBuf,

    /// Terraform executable
    #[arg(long, env = "DSS_TERRAFORM_BINARY", default_value = "terraform")]
    terraform_binary: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let Some(name) = resolve_param_name(&cli).await else {
        eprintln!(
            "Could not determine SSM parameter name. Pass --param-name or run where the \
             terraform outputs are available."
        );
        return ExitCode::from(EXIT_NO_PARAMETER);
    };

    match update(&cli, &name).await {
        Ok(ack) => {
            info!(path = %ack.path, version = ack.version, "Parameter written");
            println!("Updated SSM parameter {name} to: {}", cli.value);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(path = %name, error = %format!("{e:#}"), "Parameter write failed");
            eprintln!("Failed to update parameter: {e:#}");
            ExitCode::from(EXIT_WRITE_FAILED)
        }
    }
}

/// Explicit name if given, otherwise the stack output. `None` if neither yields one.
async fn resolve_param_name(cli: &Cli) -> Option<String> {
    if let Some(name) = explicit_param_name(cli) {
        return Some(name);
    }

    let terraform = Terraform::new(cli.terraform_binary.clone(), cli.terraform_dir.clone());
    match terraform.output(PARAMETER_NAME_OUTPUT, None).await {
        Ok(name) => Some(name),
        Err(e) => {
            debug!(error = %e, "No parameter name from terraform output");
            None
        }
    }
}

fn explicit_param_name(cli: &Cli) -> Option<String> {
    cli.param_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

async fn update(cli: &Cli, name: &str) -> anyhow::Result<ParameterAck> {
    let settings = settings(cli, &std::env::vars().collect())?;
    let sdk_config = load_sdk_config(&settings)
        .await
        .context("failed to resolve AWS configuration")?;

    let ack = SsmParameterStore::new(&sdk_config)
        .put_parameter(name, &cli.value)
        .await?;
    Ok(ack)
}

/// Environment settings with command-line overrides applied.
fn settings(cli: &Cli, vars: &HashMap<String, String>) -> Result<AwsSettings, ConfigError> {
    let mut settings = AwsSettings::from_vars(vars)?;

    if let Some(region) = cli.region.as_deref().filter(|r| !r.trim().is_empty()) {
        settings.region = region.to_string();
    }

    if let Some(url) = &cli.endpoint_url {
        settings.target = Target::LocalEmulation {
            endpoint: parse_endpoint("--endpoint-url", url)?,
        };
    }

    Ok(settings)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("update-dynamic-string").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_value_is_required() {
        assert!(Cli::try_parse_from(["update-dynamic-string"]).is_err());
    }

    #[test]
    fn test_explicit_param_name() {
        let cli = parse(&["New Value", "--param-name", "/dynamic-string-service/dev/dynamic_string"]);
        assert_eq!(cli.value, "New Value");
        assert_eq!(
            explicit_param_name(&cli).as_deref(),
            Some("/dynamic-string-service/dev/dynamic_string")
        );
    }

    #[test]
    fn test_blank_param_name_is_ignored() {
        let cli = parse(&["v", "--param-name", "  "]);
        assert_eq!(explicit_param_name(&cli), None);
    }

    #[test]
    fn test_settings_follow_environment() {
        let cli = parse(&["v"]);
        let vars = HashMap::from([("LOCALSTACK".to_string(), "1".to_string())]);

        let settings = settings(&cli, &vars).unwrap();
        assert!(settings.target.is_local());
        assert_eq!(settings.region, common::config::DEFAULT_REGION);
    }

    #[test]
    fn test_flags_override_environment() {
        let cli = parse(&[
            "v",
            "--region",
            "us-east-1",
            "--endpoint-url",
            "http://localhost:4566/",
        ]);

        let settings = settings(&cli, &HashMap::new()).unwrap();
        assert_eq!(settings.region, "us-east-1");
        assert_eq!(settings.target.endpoint(), Some("http://localhost:4566"));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let cli = parse(&["v", "--endpoint-url", "localhost"]);
        assert!(settings(&cli, &HashMap::new()).is_err());
    }

    #[tokio::test]
    async fn test_missing_terraform_yields_no_name() {
        let cli = parse(&["v", "--terraform-binary", "definitely-not-a-terraform-binary"]);
        assert_eq!(resolve_param_name(&cli).await, None);
    }
}
