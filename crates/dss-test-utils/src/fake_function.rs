//! Function double answering both observation paths from one store.
//!
//! Direct invocations get a proxy-style JSON response and HTTP reads get
//! the bare page, so the same value can be checked in either mode.

use crate::fake_service::FALLBACK_VALUE;
use crate::mock_store::InMemoryParameterStore;
use async_trait::async_trait;
use common::error::CloudError;
use common::invoke::FunctionInvoker;
use env_tests::observe::ExpectedObservation;
use serde_json::json;
use wiremock::{Request, Respond, ResponseTemplate};

const CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Renders the stored parameter like the deployed function.
///
/// Serves one stack at a time: the page shows the single value held in the
/// store, or [`FALLBACK_VALUE`] when the store is empty.
#[derive(Debug, Clone)]
pub struct FakeFunction {
    store: InMemoryParameterStore,
}

impl FakeFunction {
    pub fn new(store: InMemoryParameterStore) -> Self {
        Self { store }
    }

    /// The page currently served.
    pub fn page(&self) -> String {
        let value = self
            .store
            .values()
            .into_iter()
            .next()
            .unwrap_or_else(|| FALLBACK_VALUE.to_string());
        ExpectedObservation::for_value(&value).fragment().to_string()
    }
}

#[async_trait]
impl FunctionInvoker for FakeFunction {
    async fn invoke(&self, _function: &str, _payload: &[u8]) -> Result<Vec<u8>, CloudError> {
        let response = json!({
            "statusCode": 200,
            "headers": { "Content-Type": CONTENT_TYPE },
            "body": self.page(),
        });
        Ok(response.to_string().into_bytes())
    }
}

impl Respond for FakeFunction {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("Content-Type", CONTENT_TYPE)
            .set_body_string(self.page())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invoke_embeds_page_as_json_string() {
        let store = InMemoryParameterStore::new();
        store.seed("/p", r#"Say "hi""#);
        let function = FakeFunction::new(store);

        let payload = function.invoke("fn", b"{}").await.expect("invoke");
        let response: serde_json::Value = serde_json::from_slice(&payload).expect("json payload");

        assert_eq!(response["statusCode"], 200);
        assert_eq!(
            response["body"],
            r#"<h1>The saved string is Say "hi"</h1>"#
        );
    }

    #[test]
    fn test_empty_store_serves_fallback() {
        let function = FakeFunction::new(InMemoryParameterStore::new());
        assert_eq!(function.page(), "<h1>The saved string is Hello</h1>");
    }
}
