//! # Dynamic String Service Test Utilities
//!
//! Mock collaborators for exercising the scenario driver without real
//! infrastructure.
//!
//! ## Modules
//!
//! - `mock_provisioner` - Provisioner with scripted failure points and call counts
//! - `mock_store` - In-memory parameter store
//! - `scripted_observer` - Observer returning a fixed sequence of observations
//! - `fake_service` - Service double rendering the stored value with a propagation lag
//! - `fake_function` - Function double serving the stored value over invoke and HTTP
//! - `log_capture` - In-memory sink for asserting on log events
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dss_test_utils::*;
//!
//! let store = InMemoryParameterStore::new();
//! let provisioner = MockProvisioner::builder()
//!     .seeding(store.clone())
//!     .output_from_variable("lambda_function_name", "ssm_parameter_name")
//!     .build();
//! let strategy = FakeServiceStrategy::new(store.clone()).with_lag(2);
//!
//! // Wire into a ScenarioDriver and run...
//! ```

pub mod fake_function;
pub mod fake_service;
pub mod log_capture;
pub mod mock_provisioner;
pub mod mock_store;
pub mod scripted_observer;

pub use fake_function::*;
pub use fake_service::*;
pub use log_capture::*;
pub use mock_provisioner::*;
pub use mock_store::*;
pub use scripted_observer::*;

use tracing_subscriber::EnvFilter;

/// Install a test-friendly tracing subscriber (once per process).
///
/// Honors `RUST_LOG`, defaulting to `info` for the harness crates.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "env_tests=info,common=info,dss_test_utils=debug".into()),
        )
        .with_test_writer()
        .try_init();
}
