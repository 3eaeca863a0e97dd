//! Provisioning collaborator contract and its terraform implementation.
//!
//! A [`StackHandle`] is created before anything is applied. That lets the
//! scenario driver register teardown up front, so a partially applied stack
//! is destroyed just like a fully applied one.

use async_trait::async_trait;
use common::terraform::Terraform;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info};

pub use common::terraform::Variables;

/// Subdirectory of the infrastructure directory holding per-stack state.
const STATE_DIR: &str = ".dss-state";

/// Provisioning errors.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("apply failed: {0}")]
    Apply(String),

    #[error("output {name} unavailable: {message}")]
    Output { name: String, message: String },

    #[error("destroy failed: {0}")]
    Destroy(String),
}

/// Identity of one infrastructure stack: its name and the variables it is
/// applied (and destroyed) with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackHandle {
    name: String,
    variables: Variables,
}

impl StackHandle {
    pub fn new(name: impl Into<String>, variables: Variables) -> Self {
        Self {
            name: name.into(),
            variables,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }
}

/// Trait for the infrastructure provisioning tool (enables mocking).
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Create or update the resources described by `handle`.
    async fn apply(&self, handle: &StackHandle) -> Result<(), ProvisionError>;

    /// Read a named output of an applied stack. Values are opaque.
    async fn output(&self, handle: &StackHandle, name: &str) -> Result<String, ProvisionError>;

    /// Destroy every resource belonging to `handle`.
    async fn destroy(&self, handle: &StackHandle) -> Result<(), ProvisionError>;
}

/// Provisioner driving the `terraform` CLI.
///
/// Each stack is applied against its own state file so concurrent scenarios
/// sharing one infrastructure directory never touch each other's resources.
pub struct TerraformProvisioner {
    terraform: Terraform,
    initialized: OnceCell<()>,
}

impl TerraformProvisioner {
    pub fn new(binary: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            terraform: Terraform::new(binary, working_dir),
            initialized: OnceCell::new(),
        }
    }

    /// State file used for `handle`.
    pub fn state_path(&self, handle: &StackHandle) -> PathBuf {
        self.terraform
            .working_dir()
            .join(STATE_DIR)
            .join(format!("{}.tfstate", handle.name()))
    }

    async fn ensure_initialized(&self) -> Result<(), ProvisionError> {
        self.initialized
            .get_or_try_init(|| async {
                self.terraform
                    .init()
                    .await
                    .map_err(|e| ProvisionError::Apply(e.to_string()))
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Provisioner for TerraformProvisioner {
    async fn apply(&self, handle: &StackHandle) -> Result<(), ProvisionError> {
        self.ensure_initialized().await?;

        let state_dir = self.terraform.working_dir().join(STATE_DIR);
        tokio::fs::create_dir_all(&state_dir)
            .await
            .map_err(|e| ProvisionError::Apply(format!("cannot create {}: {e}", state_dir.display())))?;

        info!(target: "env_tests.provision", stack = %handle.name(), "Applying stack");

        self.terraform
            .apply(handle.variables(), &self.state_path(handle))
            .await
            .map_err(|e| ProvisionError::Apply(e.to_string()))
    }

    async fn output(&self, handle: &StackHandle, name: &str) -> Result<String, ProvisionError> {
        self.terraform
            .output(name, Some(&self.state_path(handle)))
            .await
            .map_err(|e| ProvisionError::Output {
                name: name.to_string(),
                message: e.to_string(),
            })
    }

    async fn destroy(&self, handle: &StackHandle) -> Result<(), ProvisionError> {
        info!(target: "env_tests.provision", stack = %handle.name(), "Destroying stack");

        let state = self.state_path(handle);
        self.terraform
            .destroy(handle.variables(), &state)
            .await
            .map_err(|e| ProvisionError::Destroy(e.to_string()))?;

        // State for a destroyed stack is empty; removing it is best effort.
        for path in [state.clone(), state.with_extension("tfstate.backup")] {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                debug!(
                    target: "env_tests.provision",
                    path = %path.display(),
                    error = %e,
                    "State file not removed"
                );
            }
        }

        Ok(())
    }
}
