//! Environment resolution: turns the process configuration into ready
//! collaborators and picks the observation strategy once.

use crate::error::ScenarioError;
use crate::fixtures::{HttpStrategy, InvokeStrategy};
use crate::observe::ObservationStrategy;
use common::aws::load_sdk_config;
use common::config::{AwsSettings, Target};
use common::invoke::{FunctionInvoker, LambdaInvoker};
use common::param_store::{ParameterStore, SsmParameterStore};
use std::sync::Arc;
use tracing::info;

/// Collaborators bound to one region and target.
#[derive(Clone)]
pub struct Environment {
    pub parameter_store: Arc<dyn ParameterStore>,
    pub strategy: Arc<dyn ObservationStrategy>,
}

impl Environment {
    /// Assemble an environment from explicit collaborators.
    pub fn new(
        parameter_store: Arc<dyn ParameterStore>,
        strategy: Arc<dyn ObservationStrategy>,
    ) -> Self {
        Self {
            parameter_store,
            strategy,
        }
    }

    /// Resolve AWS configuration and build the collaborators for `settings`.
    ///
    /// Remote mode observes through HTTP ingress; local-emulation mode
    /// invokes the function directly through the emulator. Credential or
    /// region problems surface as `ScenarioError::Configuration`.
    pub async fn resolve(settings: &AwsSettings) -> Result<Self, ScenarioError> {
        let sdk_config = load_sdk_config(settings)
            .await
            .map_err(|e| ScenarioError::Configuration(e.to_string()))?;

        let strategy = strategy_for(
            &settings.target,
            Arc::new(LambdaInvoker::new(&sdk_config)),
        )?;

        info!(
            target: "env_tests.environment",
            region = %settings.region,
            strategy = strategy.name(),
            "Environment resolved"
        );

        Ok(Self::new(
            Arc::new(SsmParameterStore::new(&sdk_config)),
            strategy,
        ))
    }
}

/// The observation strategy for `target`.
///
/// Remote mode reads the `api_base_url` output over HTTP; local emulation
/// invokes the `lambda_function_name` output through `invoker`.
pub fn strategy_for(
    target: &Target,
    invoker: Arc<dyn FunctionInvoker>,
) -> Result<Arc<dyn ObservationStrategy>, ScenarioError> {
    match target {
        Target::Remote => {
            let strategy = HttpStrategy::new().map_err(|e| {
                ScenarioError::Configuration(format!("failed to create HTTP client: {e}"))
            })?;
            Ok(Arc::new(strategy))
        }
        Target::LocalEmulation { .. } => Ok(Arc::new(InvokeStrategy::new(invoker))),
    }
}
