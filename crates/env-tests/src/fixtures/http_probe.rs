//! Remote observation: HTTP GET against the public ingress address.

use crate::eventual::{verify_convergence, Converged, RetryPolicy, VerificationTimeout};
use crate::observe::{ExpectedObservation, ObservationStrategy, ObserveError, Observer};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Stack output holding the ingress base URL.
pub const API_BASE_URL_OUTPUT: &str = "api_base_url";

/// Per-request timeout for ingress reads.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Reads one URL and expects a given status.
pub struct HttpObserver {
    client: Client,
    url: String,
    expected_status: u16,
}

impl HttpObserver {
    /// Observer expecting `200 OK` from `url`.
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            expected_status: 200,
        }
    }

    pub fn with_expected_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }
}

#[async_trait]
impl Observer for HttpObserver {
    fn describe(&self) -> String {
        format!("GET {}", self.url)
    }

    async fn observe(&self) -> Result<String, ObserveError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ObserveError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ObserveError::Request(e.to_string()))?;

        if status != self.expected_status {
            return Err(ObserveError::UnexpectedStatus { status, body });
        }

        Ok(body)
    }
}

/// Observes the service through its public HTTP ingress.
#[derive(Clone)]
pub struct HttpStrategy {
    client: Client,
}

impl HttpStrategy {
    /// Create a strategy with a client using a 10s request timeout.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client })
    }
}

impl ObservationStrategy for HttpStrategy {
    fn name(&self) -> &'static str {
        "remote-http"
    }

    fn required_output(&self) -> &'static str {
        API_BASE_URL_OUTPUT
    }

    fn bind(&self, target: String) -> Box<dyn Observer> {
        Box::new(HttpObserver::new(self.client.clone(), target))
    }
}

/// GET `url` until it answers `expected_status` with a body containing
/// `expected`, or `policy` is exhausted.
pub async fn get_with_retry(
    client: &Client,
    url: &str,
    expected_status: u16,
    expected: &ExpectedObservation,
    policy: RetryPolicy,
) -> Result<Converged, VerificationTimeout> {
    let observer = HttpObserver::new(client.clone(), url).with_expected_status(expected_status);
    verify_convergence(&observer, expected, policy).await
}
