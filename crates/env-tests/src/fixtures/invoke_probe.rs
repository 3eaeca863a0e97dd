//! Local observation: invoke the function directly and read its payload.

use crate::observe::{ObservationStrategy, ObserveError, Observer};
use async_trait::async_trait;
use common::invoke::FunctionInvoker;
use serde_json::Value;
use std::sync::Arc;

/// Stack output holding the function identifier.
pub const FUNCTION_NAME_OUTPUT: &str = "lambda_function_name";

/// Payload sent on every invocation.
pub const DEFAULT_PAYLOAD: &[u8] = b"{}";

/// Invokes one function with an empty event.
pub struct InvokeObserver {
    invoker: Arc<dyn FunctionInvoker>,
    function: String,
}

impl InvokeObserver {
    pub fn new(invoker: Arc<dyn FunctionInvoker>, function: impl Into<String>) -> Self {
        Self {
            invoker,
            function: function.into(),
        }
    }
}

#[async_trait]
impl Observer for InvokeObserver {
    fn describe(&self) -> String {
        format!("invoke {}", self.function)
    }

    async fn observe(&self) -> Result<String, ObserveError> {
        let payload = self
            .invoker
            .invoke(&self.function, DEFAULT_PAYLOAD)
            .await
            .map_err(|e| ObserveError::Invoke(e.to_string()))?;

        Ok(response_body(&payload))
    }
}

/// The rendered body of a function response.
///
/// Proxy-style responses carry the page as a JSON string under `body`;
/// that string is returned unescaped so it compares like an HTTP body.
/// Anything else is returned as lossy UTF-8 text.
pub fn response_body(payload: &[u8]) -> String {
    match serde_json::from_slice::<Value>(payload) {
        Ok(Value::Object(mut fields)) => match fields.remove("body") {
            Some(Value::String(body)) => body,
            _ => String::from_utf8_lossy(payload).into_owned(),
        },
        _ => String::from_utf8_lossy(payload).into_owned(),
    }
}

/// Observes the service by invoking its entry point directly.
#[derive(Clone)]
pub struct InvokeStrategy {
    invoker: Arc<dyn FunctionInvoker>,
}

impl InvokeStrategy {
    pub fn new(invoker: Arc<dyn FunctionInvoker>) -> Self {
        Self { invoker }
    }
}

impl ObservationStrategy for InvokeStrategy {
    fn name(&self) -> &'static str {
        "local-invoke"
    }

    fn required_output(&self) -> &'static str {
        FUNCTION_NAME_OUTPUT
    }

    fn bind(&self, target: String) -> Box<dyn Observer> {
        Box::new(InvokeObserver::new(self.invoker.clone(), target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::ExpectedObservation;
    use common::error::CloudError;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records payloads and answers with a fixed result.
    struct RecordingInvoker {
        seen: Mutex<Vec<(String, Vec<u8>)>>,
        fail: bool,
    }

    #[async_trait]
    impl FunctionInvoker for RecordingInvoker {
        async fn invoke(&self, function: &str, payload: &[u8]) -> Result<Vec<u8>, CloudError> {
            self.seen
                .lock()
                .expect("lock poisoned")
                .push((function.to_string(), payload.to_vec()));
            if self.fail {
                return Err(CloudError::Invoke {
                    function: function.to_string(),
                    message: "ResourceNotFoundException".to_string(),
                });
            }
            Ok(br#"{"statusCode": 200, "body": "<h1>The saved string is Hi</h1>"}"#.to_vec())
        }
    }

    #[tokio::test]
    async fn test_observe_sends_empty_event() {
        let invoker = Arc::new(RecordingInvoker {
            seen: Mutex::new(Vec::new()),
            fail: false,
        });
        let observer = InvokeStrategy::new(invoker.clone()).bind("fn-test".to_string());

        let body = observer.observe().await.expect("invoke should succeed");

        assert_eq!(body, "<h1>The saved string is Hi</h1>");
        let seen = invoker.seen.lock().expect("lock poisoned");
        assert_eq!(seen.as_slice(), &[("fn-test".to_string(), b"{}".to_vec())]);
    }

    #[tokio::test]
    async fn test_invoke_failure_preserves_cause() {
        let invoker = Arc::new(RecordingInvoker {
            seen: Mutex::new(Vec::new()),
            fail: true,
        });
        let observer = InvokeObserver::new(invoker, "fn-missing");

        let err = observer.observe().await.expect_err("invoke should fail");
        match err {
            ObserveError::Invoke(message) => {
                assert!(message.contains("fn-missing"));
                assert!(message.contains("ResourceNotFoundException"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_response_body_unescapes_proxy_body() {
        let value = r#"Say "hi" from C:\path"#;
        let payload = json!({
            "statusCode": 200,
            "headers": { "Content-Type": "text/html; charset=utf-8" },
            "body": ExpectedObservation::for_value(value).fragment(),
        })
        .to_string();

        let body = response_body(payload.as_bytes());

        assert_eq!(body, ExpectedObservation::for_value(value).fragment());
        assert!(ExpectedObservation::for_value(value).matches(&body));
    }

    #[test]
    fn test_response_body_falls_back_to_text() {
        assert_eq!(response_body(b"plain text"), "plain text");
        assert_eq!(response_body(br#"{"statusCode": 500}"#), r#"{"statusCode": 500}"#);
        assert_eq!(response_body(br#"{"body": 42}"#), r#"{"body": 42}"#);
        assert_eq!(response_body(br#"["body"]"#), r#"["body"]"#);
    }
}
