//! Direct Lambda invocation.

use crate::error::CloudError;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_lambda::error::DisplayErrorContext;
use aws_sdk_lambda::primitives::Blob;
use tracing::debug;

/// Trait for invoking a function by identifier (enables mocking).
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    /// Invoke `function` synchronously with `payload` and return the response payload.
    async fn invoke(&self, function: &str, payload: &[u8]) -> Result<Vec<u8>, CloudError>;
}

/// Invoker backed by the AWS Lambda API.
#[derive(Debug, Clone)]
pub struct LambdaInvoker {
    client: aws_sdk_lambda::Client,
}

impl LambdaInvoker {
    /// Create an invoker from the shared SDK configuration.
    #[must_use]
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_lambda::Client::new(config),
        }
    }
}

#[async_trait]
impl FunctionInvoker for LambdaInvoker {
    async fn invoke(&self, function: &str, payload: &[u8]) -> Result<Vec<u8>, CloudError> {
        let output = self
            .client
            .invoke()
            .function_name(function)
            .payload(Blob::new(payload.to_vec()))
            .send()
            .await
            .map_err(|e| CloudError::Invoke {
                function: function.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let body = output
            .payload()
            .map(|blob| blob.as_ref().to_vec())
            .unwrap_or_default();

        // The API call succeeds even when the handler raised; the payload then
        // holds the error document instead of the handler's return value.
        if let Some(kind) = output.function_error() {
            return Err(CloudError::Invoke {
                function: function.to_string(),
                message: format!("{kind}: {}", String::from_utf8_lossy(&body)),
            });
        }

        debug!(
            target: "common.invoke",
            function = %function,
            status = output.status_code(),
            bytes = body.len(),
            "Function invoked"
        );

        Ok(body)
    }
}
