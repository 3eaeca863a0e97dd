//! Environment resolution for AWS clients.
//!
//! Builds one [`SdkConfig`] bound to the configured region and, in
//! local-emulation mode, to the emulator endpoint. Credentials are resolved
//! eagerly so a misconfigured machine fails before anything is provisioned.

use crate::config::AwsSettings;
use crate::error::CloudError;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_ssm::error::DisplayErrorContext;
use tracing::{debug, info};

/// Load the shared SDK configuration for `settings`.
///
/// # Errors
///
/// Returns `CloudError::Configuration` when no region or no credentials can be
/// resolved. These are not transient, so callers should not retry.
pub async fn load_sdk_config(settings: &AwsSettings) -> Result<SdkConfig, CloudError> {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(settings.region.clone()));

    if let Some(endpoint) = settings.target.endpoint() {
        debug!(target: "common.aws", endpoint = %endpoint, "Redirecting AWS clients to emulator");
        loader = loader.endpoint_url(endpoint);
    }

    let config = loader.load().await;

    if config.region().is_none() {
        return Err(CloudError::Configuration(format!(
            "no region resolved (requested {})",
            settings.region
        )));
    }

    ensure_credentials(&config).await?;

    info!(
        target: "common.aws",
        region = %settings.region,
        local = settings.target.is_local(),
        "AWS configuration resolved"
    );

    Ok(config)
}

async fn ensure_credentials(config: &SdkConfig) -> Result<(), CloudError> {
    let provider = config
        .credentials_provider()
        .ok_or_else(|| CloudError::Configuration("no credentials provider configured".to_string()))?;

    provider.provide_credentials().await.map_err(|e| {
        CloudError::Configuration(format!(
            "credential resolution failed: {}",
            DisplayErrorContext(&e)
        ))
    })?;

    Ok(())
}
