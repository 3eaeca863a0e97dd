//! Observation strategies for the deployed service.

pub mod http_probe;
pub mod invoke_probe;

pub use http_probe::{HttpObserver, HttpStrategy};
pub use invoke_probe::{InvokeObserver, InvokeStrategy};
