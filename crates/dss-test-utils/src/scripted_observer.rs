//! Observer returning a scripted sequence of observations.

use async_trait::async_trait;
use env_tests::observe::{ExpectedObservation, ObservationStrategy, ObserveError, Observer};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Step = Result<String, ObserveError>;

/// Observer that replays a script, repeating the final entry once exhausted.
/// Clones share the script and the call counter.
#[derive(Debug, Clone)]
pub struct ScriptedObserver {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    script: Mutex<VecDeque<Step>>,
    last: Mutex<Option<Step>>,
    calls: AtomicUsize,
}

impl ScriptedObserver {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            inner: Arc::new(Inner {
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
                calls: AtomicUsize::new(0),
            }),
        }
    }

    /// `k - 1` stale renderings of `stale`, then the rendering of `value`.
    pub fn matching_on(k: usize, stale: &str, value: &str) -> Self {
        let mut script: Vec<Step> = (1..k).map(|_| Ok(render(stale))).collect();
        script.push(Ok(render(value)));
        Self::new(script)
    }

    /// Always renders `value`.
    pub fn always(value: &str) -> Self {
        Self::new(vec![Ok(render(value))])
    }

    /// Always fails with `error`.
    pub fn failing(error: ObserveError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }
}

/// The body the service renders for `value`.
pub fn render(value: &str) -> String {
    ExpectedObservation::for_value(value).fragment().to_string()
}

#[async_trait]
impl Observer for ScriptedObserver {
    fn describe(&self) -> String {
        "scripted".to_string()
    }

    async fn observe(&self) -> Result<String, ObserveError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);

        let next = self.inner.script.lock().expect("script lock poisoned").pop_front();
        let mut last = self.inner.last.lock().expect("last lock poisoned");
        match next {
            Some(step) => {
                *last = Some(step.clone());
                step
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(ObserveError::Request("empty script".to_string()))),
        }
    }
}

/// Strategy handing out one shared [`ScriptedObserver`].
#[derive(Debug, Clone)]
pub struct ScriptedStrategy {
    observer: ScriptedObserver,
    bound: Arc<Mutex<Vec<String>>>,
}

impl ScriptedStrategy {
    pub fn new(observer: ScriptedObserver) -> Self {
        Self {
            observer,
            bound: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Targets the strategy was bound to.
    pub fn bound_targets(&self) -> Vec<String> {
        self.bound.lock().expect("bound lock poisoned").clone()
    }
}

impl ObservationStrategy for ScriptedStrategy {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn required_output(&self) -> &'static str {
        "lambda_function_name"
    }

    fn bind(&self, target: String) -> Box<dyn Observer> {
        self.bound.lock().expect("bound lock poisoned").push(target);
        Box::new(self.observer.clone())
    }
}
