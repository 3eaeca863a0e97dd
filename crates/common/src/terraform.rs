//! Runner for the `terraform` CLI.
//!
//! Every command runs non-interactively (`-input=false`, `-no-color`) in the
//! directory holding the infrastructure description. Stacks are isolated from
//! each other by giving each one its own local state file.

use crate::error::CloudError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Input variables passed to `apply` / `destroy` as `-var` flags.
pub type Variables = BTreeMap<String, Value>;

/// Stderr is cut to this many trailing characters in error messages.
const MAX_ERROR_OUTPUT: usize = 2000;

/// Handle on a terraform binary and working directory.
#[derive(Debug, Clone)]
pub struct Terraform {
    binary: String,
    working_dir: PathBuf,
}

impl Terraform {
    /// Create a runner for `binary` operating in `working_dir`.
    #[must_use]
    pub fn new(binary: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            working_dir: working_dir.into(),
        }
    }

    /// Directory the commands run in.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// `terraform init`.
    ///
    /// # Errors
    ///
    /// Returns `CloudError::Terraform` if the command fails.
    pub async fn init(&self) -> Result<(), CloudError> {
        self.run("init", &["-input=false".to_string()]).await?;
        Ok(())
    }

    /// `terraform apply -auto-approve` against the state file at `state`.
    ///
    /// # Errors
    ///
    /// Returns `CloudError::Terraform` if the command fails.
    pub async fn apply(&self, vars: &Variables, state: &Path) -> Result<(), CloudError> {
        let mut args = vec![
            "-input=false".to_string(),
            "-auto-approve".to_string(),
            format!("-state={}", state.display()),
        ];
        args.extend(var_args(vars));
        self.run("apply", &args).await?;
        Ok(())
    }

    /// `terraform destroy -auto-approve` against the state file at `state`.
    ///
    /// # Errors
    ///
    /// Returns `CloudError::Terraform` if the command fails.
    pub async fn destroy(&self, vars: &Variables, state: &Path) -> Result<(), CloudError> {
        let mut args = vec![
            "-input=false".to_string(),
            "-auto-approve".to_string(),
            format!("-state={}", state.display()),
        ];
        args.extend(var_args(vars));
        self.run("destroy", &args).await?;
        Ok(())
    }

    /// `terraform output -raw <name>`, optionally against a specific state file.
    ///
    /// # Errors
    ///
    /// Returns `CloudError::Terraform` if the command fails or the output is empty.
    pub async fn output(&self, name: &str, state: Option<&Path>) -> Result<String, CloudError> {
        let mut args = vec!["-raw".to_string()];
        if let Some(state) = state {
            args.push(format!("-state={}", state.display()));
        }
        args.push(name.to_string());

        let stdout = self.run("output", &args).await?;
        let value = stdout.trim().to_string();

        if value.is_empty() {
            return Err(CloudError::Terraform {
                command: "output".to_string(),
                message: format!("output {name} is empty"),
            });
        }

        Ok(value)
    }

    async fn run(&self, command: &str, args: &[String]) -> Result<String, CloudError> {
        debug!(
            target: "common.terraform",
            command = %command,
            dir = %self.working_dir.display(),
            "Running terraform"
        );

        let output = Command::new(&self.binary)
            .arg(command)
            .arg("-no-color")
            .args(args)
            .current_dir(&self.working_dir)
            .env("TF_IN_AUTOMATION", "1")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CloudError::Terraform {
                command: command.to_string(),
                message: format!("failed to spawn {}: {e}", self.binary),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CloudError::Terraform {
                command: command.to_string(),
                message: format!("{}: {}", output.status, tail(stderr.trim(), MAX_ERROR_OUTPUT)),
            });
        }

        info!(target: "common.terraform", command = %command, "terraform command succeeded");

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Render variables as `-var key=value` pairs.
///
/// Strings are passed verbatim; everything else is passed as its JSON text,
/// which terraform parses as the equivalent HCL literal.
#[must_use]
pub fn var_args(vars: &Variables) -> Vec<String> {
    vars.iter()
        .flat_map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            ["-var".to_string(), format!("{key}={rendered}")]
        })
        .collect()
}

/// Last `max` characters of `text`, on a character boundary.
fn tail(text: &str, max: usize) -> &str {
    let count = text.chars().count();
    if count <= max {
        return text;
    }
    let skip = count - max;
    text.char_indices()
        .nth(skip)
        .map_or(text, |(idx, _)| text.get(idx..).unwrap_or(text))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_var_args_renders_strings_verbatim() {
        let mut vars = Variables::new();
        vars.insert("environment".to_string(), json!("test-abc"));
        vars.insert("use_localstack".to_string(), json!(true));

        let args = var_args(&vars);

        assert_eq!(
            args,
            vec![
                "-var".to_string(),
                "environment=test-abc".to_string(),
                "-var".to_string(),
                "use_localstack=true".to_string(),
            ]
        );
    }

    #[test]
    fn test_var_args_keeps_spaces_in_values() {
        let mut vars = Variables::new();
        vars.insert("dynamic_string_default".to_string(), json!("Hello Terratest"));

        let args = var_args(&vars);
        assert_eq!(args.get(1).unwrap(), "dynamic_string_default=Hello Terratest");
    }

    #[test]
    fn test_tail_short_text_untouched() {
        assert_eq!(tail("short", 10), "short");
    }

    #[test]
    fn test_tail_keeps_last_chars() {
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("ééééé", 2), "éé");
    }

    #[tokio::test]
    async fn test_missing_binary_is_terraform_error() {
        let terraform = Terraform::new("definitely-not-a-terraform-binary", ".");
        let err = terraform.init().await.unwrap_err();
        assert!(matches!(err, CloudError::Terraform { command, .. } if command == "init"));
    }
}
