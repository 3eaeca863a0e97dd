//! SSM parameter store client.

use crate::error::CloudError;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ssm::error::DisplayErrorContext;
use aws_sdk_ssm::types::ParameterType;
use tracing::{debug, info};

/// Acknowledgement returned once the store has accepted a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterAck {
    pub path: String,
    pub version: i64,
}

/// Trait for parameter store writes (enables mocking).
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Write `value` to `path` as a plain `String` parameter, overwriting any
    /// existing value. Returns once the store acknowledges the write.
    async fn put_parameter(&self, path: &str, value: &str) -> Result<ParameterAck, CloudError>;
}

/// Parameter store backed by AWS Systems Manager.
#[derive(Debug, Clone)]
pub struct SsmParameterStore {
    client: aws_sdk_ssm::Client,
}

impl SsmParameterStore {
    /// Create a store from the shared SDK configuration.
    #[must_use]
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_ssm::Client::new(config),
        }
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    async fn put_parameter(&self, path: &str, value: &str) -> Result<ParameterAck, CloudError> {
        debug!(target: "common.param_store", path = %path, "Writing parameter");

        let output = self
            .client
            .put_parameter()
            .name(path)
            .value(value)
            .r#type(ParameterType::String)
            .overwrite(true)
            .send()
            .await
            .map_err(|e| CloudError::Store {
                path: path.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let version = output.version();
        info!(target: "common.param_store", path = %path, version, "Parameter updated");

        Ok(ParameterAck {
            path: path.to_string(),
            version,
        })
    }
}
