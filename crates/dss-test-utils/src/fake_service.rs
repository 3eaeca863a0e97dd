//! Service double: renders the stored parameter like the deployed function,
//! with a configurable propagation lag after each change.

use crate::mock_store::InMemoryParameterStore;
use async_trait::async_trait;
use env_tests::observe::{ExpectedObservation, ObservationStrategy, ObserveError, Observer};
use serde_json::json;
use std::sync::Mutex;

/// Value the function falls back to when the parameter is missing.
pub const FALLBACK_VALUE: &str = "Hello";

/// Strategy whose observers read an [`InMemoryParameterStore`].
///
/// The bound target is the parameter path, so pair it with a provisioner
/// that echoes `ssm_parameter_name` as the required output.
#[derive(Debug, Clone)]
pub struct FakeServiceStrategy {
    store: InMemoryParameterStore,
    lag: usize,
}

impl FakeServiceStrategy {
    pub fn new(store: InMemoryParameterStore) -> Self {
        Self { store, lag: 0 }
    }

    /// Serve the previous value for `lag` observations after each change.
    pub fn with_lag(mut self, lag: usize) -> Self {
        self.lag = lag;
        self
    }
}

impl ObservationStrategy for FakeServiceStrategy {
    fn name(&self) -> &'static str {
        "fake-service"
    }

    fn required_output(&self) -> &'static str {
        "lambda_function_name"
    }

    fn bind(&self, target: String) -> Box<dyn Observer> {
        Box::new(FakeServiceObserver {
            store: self.store.clone(),
            path: target,
            lag: self.lag,
            state: Mutex::new(State::default()),
        })
    }
}

#[derive(Debug, Default)]
struct State {
    visible: Option<String>,
    /// Newer value and how many more stale reads remain before it shows.
    pending: Option<(String, usize)>,
}

struct FakeServiceObserver {
    store: InMemoryParameterStore,
    path: String,
    lag: usize,
    state: Mutex<State>,
}

#[async_trait]
impl Observer for FakeServiceObserver {
    fn describe(&self) -> String {
        format!("fake service reading {}", self.path)
    }

    async fn observe(&self) -> Result<String, ObserveError> {
        let current = self
            .store
            .get(&self.path)
            .unwrap_or_else(|| FALLBACK_VALUE.to_string());

        let mut state = self.state.lock().expect("state lock poisoned");
        let visible = match state.visible.take() {
            None => current,
            Some(visible) if visible == current => visible,
            Some(visible) => match state.pending.take() {
                Some((value, 0)) if value == current => value,
                Some((value, remaining)) if value == current => {
                    state.pending = Some((value, remaining - 1));
                    visible
                }
                _ if self.lag == 0 => current,
                _ => {
                    state.pending = Some((current, self.lag - 1));
                    visible
                }
            },
        };
        state.visible = Some(visible.clone());

        let payload = json!({
            "statusCode": 200,
            "headers": { "Content-Type": "text/html; charset=utf-8" },
            "body": ExpectedObservation::for_value(&visible).fragment(),
        });
        Ok(payload.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::param_store::ParameterStore;

    #[tokio::test]
    async fn test_update_visible_after_lag() {
        let store = InMemoryParameterStore::new();
        store.seed("/p", "old");
        let observer = FakeServiceStrategy::new(store.clone())
            .with_lag(2)
            .bind("/p".to_string());
        let old = ExpectedObservation::for_value("old");
        let new = ExpectedObservation::for_value("new");

        assert!(old.matches(&observer.observe().await.expect("cold read")));

        store.put_parameter("/p", "new").await.expect("write");

        assert!(old.matches(&observer.observe().await.expect("stale 1")));
        assert!(old.matches(&observer.observe().await.expect("stale 2")));
        assert!(new.matches(&observer.observe().await.expect("fresh")));
        assert!(new.matches(&observer.observe().await.expect("still fresh")));
    }

    #[tokio::test]
    async fn test_missing_parameter_renders_fallback() {
        let observer = FakeServiceStrategy::new(InMemoryParameterStore::new()).bind("/none".to_string());
        let body = observer.observe().await.expect("observe");
        assert!(ExpectedObservation::for_value(FALLBACK_VALUE).matches(&body));
    }
}
