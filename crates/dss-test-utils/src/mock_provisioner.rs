//! Mock provisioner for scenario driver tests.
//!
//! Can be configured to:
//! - Fail (or panic) at apply, output or destroy
//! - Return fixed outputs or echo an applied variable as an output
//! - Create and remove the stack's parameter in an [`InMemoryParameterStore`],
//!   the way the real infrastructure does
//!
//! # Example
//!
//! ```rust,ignore
//! use dss_test_utils::MockProvisioner;
//!
//! let provisioner = MockProvisioner::builder()
//!     .fail_apply()
//!     .build();
//!
//! // Run a scenario, then:
//! assert_eq!(provisioner.destroy_calls(), 1);
//! ```

use crate::mock_store::InMemoryParameterStore;
use async_trait::async_trait;
use env_tests::provision::{ProvisionError, Provisioner, StackHandle};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Where an output value comes from.
#[derive(Debug, Clone)]
enum OutputSource {
    Fixed(String),
    Variable(String),
}

/// Mock provisioner recording every call.
#[derive(Debug, Default)]
pub struct MockProvisioner {
    outputs: HashMap<String, OutputSource>,
    fail_apply: bool,
    fail_output: bool,
    panic_on_output: bool,
    fail_destroy: bool,
    store: Option<InMemoryParameterStore>,
    apply_calls: AtomicUsize,
    output_calls: AtomicUsize,
    destroy_calls: AtomicUsize,
    destroyed: Mutex<Vec<String>>,
}

impl MockProvisioner {
    /// Create a MockProvisioner builder.
    pub fn builder() -> MockProvisionerBuilder {
        MockProvisionerBuilder::default()
    }

    /// A provisioner where everything succeeds with default outputs.
    pub fn succeeding() -> Self {
        Self::builder().build()
    }

    pub fn apply_calls(&self) -> usize {
        self.apply_calls.load(Ordering::SeqCst)
    }

    pub fn output_calls(&self) -> usize {
        self.output_calls.load(Ordering::SeqCst)
    }

    pub fn destroy_calls(&self) -> usize {
        self.destroy_calls.load(Ordering::SeqCst)
    }

    /// Names of destroyed stacks, in call order.
    pub fn destroyed(&self) -> Vec<String> {
        self.destroyed.lock().expect("lock poisoned").clone()
    }

    fn variable(handle: &StackHandle, name: &str) -> Option<String> {
        handle
            .variables()
            .get(name)
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
    }
}

#[async_trait]
impl Provisioner for MockProvisioner {
    async fn apply(&self, handle: &StackHandle) -> Result<(), ProvisionError> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);

        // The parameter is created even when a later resource fails to apply.
        if let Some(store) = &self.store {
            if let (Some(path), Some(default)) = (
                Self::variable(handle, "ssm_parameter_name"),
                Self::variable(handle, "dynamic_string_default"),
            ) {
                store.seed(&path, &default);
            }
        }

        if self.fail_apply {
            return Err(ProvisionError::Apply("mock apply failure".to_string()));
        }
        Ok(())
    }

    async fn output(&self, handle: &StackHandle, name: &str) -> Result<String, ProvisionError> {
        self.output_calls.fetch_add(1, Ordering::SeqCst);

        if self.panic_on_output {
            panic!("mock provisioner panicked reading output {name}");
        }

        let missing = || ProvisionError::Output {
            name: name.to_string(),
            message: "mock output unavailable".to_string(),
        };

        if self.fail_output {
            return Err(missing());
        }

        match self.outputs.get(name) {
            Some(OutputSource::Fixed(value)) => Ok(value.clone()),
            Some(OutputSource::Variable(var)) => Self::variable(handle, var).ok_or_else(missing),
            None => Err(missing()),
        }
    }

    async fn destroy(&self, handle: &StackHandle) -> Result<(), ProvisionError> {
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
        self.destroyed
            .lock()
            .expect("lock poisoned")
            .push(handle.name().to_string());

        if self.fail_destroy {
            return Err(ProvisionError::Destroy("mock destroy failure".to_string()));
        }

        if let Some(store) = &self.store {
            if let Some(path) = Self::variable(handle, "ssm_parameter_name") {
                store.remove(&path);
            }
        }
        Ok(())
    }
}

/// Builder for MockProvisioner configuration.
#[derive(Debug)]
pub struct MockProvisionerBuilder {
    inner: MockProvisioner,
}

impl Default for MockProvisionerBuilder {
    fn default() -> Self {
        let mut inner = MockProvisioner::default();
        inner.outputs.insert(
            "api_base_url".to_string(),
            OutputSource::Fixed("http://mock-ingress.invalid".to_string()),
        );
        inner.outputs.insert(
            "lambda_function_name".to_string(),
            OutputSource::Fixed("mock-function".to_string()),
        );
        Self { inner }
    }
}

impl MockProvisionerBuilder {
    pub fn fail_apply(mut self) -> Self {
        self.inner.fail_apply = true;
        self
    }

    pub fn fail_output(mut self) -> Self {
        self.inner.fail_output = true;
        self
    }

    pub fn panic_on_output(mut self) -> Self {
        self.inner.panic_on_output = true;
        self
    }

    pub fn fail_destroy(mut self) -> Self {
        self.inner.fail_destroy = true;
        self
    }

    /// Return `value` for output `name`.
    pub fn with_output(mut self, name: &str, value: &str) -> Self {
        self.inner
            .outputs
            .insert(name.to_string(), OutputSource::Fixed(value.to_string()));
        self
    }

    /// Return the applied value of `variable` for output `name`.
    pub fn output_from_variable(mut self, name: &str, variable: &str) -> Self {
        self.inner
            .outputs
            .insert(name.to_string(), OutputSource::Variable(variable.to_string()));
        self
    }

    /// Create the stack's parameter in `store` on apply, remove it on destroy.
    pub fn seeding(mut self, store: InMemoryParameterStore) -> Self {
        self.inner.store = Some(store);
        self
    }

    pub fn build(self) -> MockProvisioner {
        self.inner
    }
}
