//! Scenario driver.
//!
//! One scenario is a full provision → verify initial → mutate → verify
//! updated → destroy cycle against its own namespace. Scenarios are described
//! by a [`ScenarioDescriptor`] and executed by [`ScenarioDriver::run`], which
//! destroys the stack exactly once on every exit path, including panics.
//!
//! # Example
//!
//! ```rust,ignore
//! use env_tests::scenario::{ScenarioDriver, FULL_LIFECYCLE};
//!
//! let driver = ScenarioDriver::from_env().await?;
//! let report = driver.run(&FULL_LIFECYCLE).await?;
//! assert!(report.teardown_error.is_none());
//! ```

use crate::config::HarnessConfig;
use crate::environment::Environment;
use crate::error::{ScenarioError, ScenarioFailure, ScenarioStep};
use crate::eventual::{verify_convergence, RetryPolicy};
use crate::namespace::Namespace;
use crate::observe::ExpectedObservation;
use crate::provision::{Provisioner, StackHandle, TerraformProvisioner, Variables};
use common::config::Target;
use futures::FutureExt;
use serde_json::json;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

/// What distinguishes one scenario from another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioDescriptor {
    pub name: &'static str,
    pub namespace_prefix: &'static str,
    pub initial_value: &'static str,
    pub updated_value: &'static str,
}

/// Full lifecycle: deploy with a default value, then update it.
pub const FULL_LIFECYCLE: ScenarioDescriptor = ScenarioDescriptor {
    name: "dynamic_string_service",
    namespace_prefix: "test",
    initial_value: "Hello Terratest",
    updated_value: "Updated by Terratest",
};

/// Same cycle with distinct values, focused on the update path.
pub const UPDATE_ONLY: ScenarioDescriptor = ScenarioDescriptor {
    name: "dynamic_string_update_only",
    namespace_prefix: "test-upd",
    initial_value: "Init For Update Test",
    updated_value: "Updated In Update Test",
};

/// Every scenario the suite runs.
pub const SCENARIOS: [ScenarioDescriptor; 2] = [FULL_LIFECYCLE, UPDATE_ONLY];

/// Immutable per-run context, built once when a scenario starts.
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    namespace: Namespace,
    region: String,
    target: Target,
    initial_value: String,
    updated_value: String,
    initial_expected: ExpectedObservation,
    updated_expected: ExpectedObservation,
    cold_read: RetryPolicy,
    propagation: RetryPolicy,
}

impl ScenarioContext {
    /// Build a context for `descriptor` in a freshly generated namespace.
    pub fn new(descriptor: &ScenarioDescriptor, config: &HarnessConfig) -> Self {
        let namespace = Namespace::generate(&config.project_name, descriptor.namespace_prefix);
        Self::with_namespace(descriptor, config, namespace)
    }

    /// Build a context for `descriptor` in an explicit namespace.
    pub fn with_namespace(
        descriptor: &ScenarioDescriptor,
        config: &HarnessConfig,
        namespace: Namespace,
    ) -> Self {
        Self {
            namespace,
            region: config.aws.region.clone(),
            target: config.aws.target.clone(),
            initial_value: descriptor.initial_value.to_string(),
            updated_value: descriptor.updated_value.to_string(),
            initial_expected: ExpectedObservation::for_value(descriptor.initial_value),
            updated_expected: ExpectedObservation::for_value(descriptor.updated_value),
            cold_read: config.cold_read,
            propagation: config.propagation,
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn updated_value(&self) -> &str {
        &self.updated_value
    }

    pub fn initial_expected(&self) -> &ExpectedObservation {
        &self.initial_expected
    }

    pub fn updated_expected(&self) -> &ExpectedObservation {
        &self.updated_expected
    }

    /// Variable set handed to the provisioning tool.
    pub fn variables(&self) -> Variables {
        let mut vars = Variables::new();
        vars.insert("aws_region".to_string(), json!(self.region));
        vars.insert("environment".to_string(), json!(self.namespace.environment));
        vars.insert(
            "ssm_parameter_name".to_string(),
            json!(self.namespace.parameter_path),
        );
        vars.insert(
            "dynamic_string_default".to_string(),
            json!(self.initial_value),
        );

        if let Target::LocalEmulation { endpoint } = &self.target {
            vars.insert("use_localstack".to_string(), json!(true));
            vars.insert("localstack_endpoint".to_string(), json!(endpoint));
        }

        vars
    }

    fn provision_error(&self, step: ScenarioStep, message: impl ToString) -> ScenarioError {
        ScenarioError::Provision {
            namespace: self.namespace.environment.clone(),
            step,
            message: message.to_string(),
        }
    }
}

/// Outcome of a successful scenario.
#[derive(Debug)]
pub struct ScenarioReport {
    pub namespace: Namespace,
    pub initial_attempts: u32,
    pub updated_attempts: u32,
    /// Teardown is best effort; a failure here does not fail the scenario.
    pub teardown_error: Option<ScenarioError>,
}

/// Attempts spent in each verification step.
struct Progress {
    initial_attempts: u32,
    updated_attempts: u32,
}

/// Runs scenarios against one environment and provisioner.
pub struct ScenarioDriver {
    config: HarnessConfig,
    environment: Environment,
    provisioner: Arc<dyn Provisioner>,
}

impl ScenarioDriver {
    pub fn new(
        config: HarnessConfig,
        environment: Environment,
        provisioner: Arc<dyn Provisioner>,
    ) -> Self {
        Self {
            config,
            environment,
            provisioner,
        }
    }

    /// Build a driver from environment variables, real AWS clients and terraform.
    pub async fn from_env() -> Result<Self, ScenarioError> {
        let config = HarnessConfig::from_env()?;
        let environment = Environment::resolve(&config.aws).await?;
        let provisioner = Arc::new(TerraformProvisioner::new(
            config.terraform_binary.clone(),
            config.terraform_dir.clone(),
        ));
        Ok(Self::new(config, environment, provisioner))
    }

    /// Run one scenario in a fresh namespace.
    pub async fn run(
        &self,
        descriptor: &ScenarioDescriptor,
    ) -> Result<ScenarioReport, ScenarioFailure> {
        let context = ScenarioContext::new(descriptor, &self.config);
        self.run_in(context).await
    }

    /// Run a scenario with a prepared context.
    pub async fn run_in(&self, context: ScenarioContext) -> Result<ScenarioReport, ScenarioFailure> {
        let span = info_span!(
            target: "env_tests.scenario",
            "scenario",
            namespace = %context.namespace(),
            strategy = self.environment.strategy.name()
        );

        async move {
            let handle = StackHandle::new(
                context.namespace().environment.clone(),
                context.variables(),
            );

            let outcome = AssertUnwindSafe(self.execute(&context, &handle))
                .catch_unwind()
                .await;

            // Runs on every path: success, error and panic.
            let teardown = self.teardown(&context, &handle).await;

            match outcome {
                Ok(Ok(progress)) => {
                    info!(target: "env_tests.scenario", "Scenario passed");
                    if let Some(teardown) = &teardown {
                        warn!(
                            target: "env_tests.scenario",
                            error = %teardown,
                            "Teardown failed after a passing scenario"
                        );
                    }
                    Ok(ScenarioReport {
                        namespace: context.namespace().clone(),
                        initial_attempts: progress.initial_attempts,
                        updated_attempts: progress.updated_attempts,
                        teardown_error: teardown,
                    })
                }
                Ok(Err(error)) => {
                    error!(
                        target: "env_tests.scenario",
                        step = %error.step(),
                        error = %error,
                        "Scenario failed"
                    );
                    if let Some(teardown) = &teardown {
                        warn!(
                            target: "env_tests.scenario",
                            error = %teardown,
                            "Teardown also failed"
                        );
                    }
                    Err(ScenarioFailure {
                        namespace: context.namespace().clone(),
                        error,
                        teardown,
                    })
                }
                Err(panic) => {
                    if let Some(teardown) = &teardown {
                        warn!(
                            target: "env_tests.scenario",
                            error = %teardown,
                            "Teardown failed after panic"
                        );
                    }
                    std::panic::resume_unwind(panic)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        context: &ScenarioContext,
        handle: &StackHandle,
    ) -> Result<Progress, ScenarioError> {
        let namespace = context.namespace();

        // Step 1: Provision
        info!(target: "env_tests.scenario", step = %ScenarioStep::Provision, "Applying infrastructure");
        self.provisioner
            .apply(handle)
            .await
            .map_err(|e| context.provision_error(ScenarioStep::Provision, e))?;

        // Step 2: Resolve the observation target from the stack outputs
        let strategy = &self.environment.strategy;
        let target = self
            .provisioner
            .output(handle, strategy.required_output())
            .await
            .map_err(|e| context.provision_error(ScenarioStep::ReadOutputs, e))?;
        let observer = strategy.bind(target);

        // Step 3: Initial value visible
        info!(
            target: "env_tests.scenario",
            step = %ScenarioStep::VerifyInitial,
            observer = %observer.describe(),
            "Verifying initial value"
        );
        let initial = verify_convergence(
            observer.as_ref(),
            context.initial_expected(),
            context.cold_read,
        )
        .await
        .map_err(|timeout| ScenarioError::VerificationTimeout {
            namespace: namespace.environment.clone(),
            step: ScenarioStep::VerifyInitial,
            timeout,
        })?;

        // Step 4: Mutate the parameter
        info!(target: "env_tests.scenario", step = %ScenarioStep::Mutate, "Updating parameter");
        self.environment
            .parameter_store
            .put_parameter(&namespace.parameter_path, context.updated_value())
            .await
            .map_err(|e| ScenarioError::Store {
                namespace: namespace.environment.clone(),
                path: namespace.parameter_path.clone(),
                message: e.to_string(),
            })?;

        // Step 5: Updated value propagates
        info!(target: "env_tests.scenario", step = %ScenarioStep::VerifyUpdated, "Verifying updated value");
        let updated = verify_convergence(
            observer.as_ref(),
            context.updated_expected(),
            context.propagation,
        )
        .await
        .map_err(|timeout| ScenarioError::VerificationTimeout {
            namespace: namespace.environment.clone(),
            step: ScenarioStep::VerifyUpdated,
            timeout,
        })?;

        Ok(Progress {
            initial_attempts: initial.attempts,
            updated_attempts: updated.attempts,
        })
    }

    async fn teardown(&self, context: &ScenarioContext, handle: &StackHandle) -> Option<ScenarioError> {
        info!(target: "env_tests.scenario", step = %ScenarioStep::Teardown, "Destroying infrastructure");

        match self.provisioner.destroy(handle).await {
            Ok(()) => None,
            Err(e) => Some(ScenarioError::Destroy {
                namespace: context.namespace().environment.clone(),
                message: e.to_string(),
            }),
        }
    }
}
