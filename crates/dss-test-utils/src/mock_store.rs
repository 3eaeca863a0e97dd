//! In-memory parameter store.

use async_trait::async_trait;
use common::error::CloudError;
use common::param_store::{ParameterAck, ParameterStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Parameter store keeping values in memory. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryParameterStore {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    values: Mutex<HashMap<String, (String, i64)>>,
    writes: AtomicUsize,
    fail_writes: bool,
}

impl InMemoryParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects every write.
    pub fn failing() -> Self {
        Self {
            inner: Arc::new(Inner {
                fail_writes: true,
                ..Inner::default()
            }),
        }
    }

    /// Set a value directly, as the infrastructure would on creation.
    pub fn seed(&self, path: &str, value: &str) {
        let mut values = self.inner.values.lock().expect("store lock poisoned");
        let version = values.get(path).map_or(1, |(_, v)| v + 1);
        values.insert(path.to_string(), (value.to_string(), version));
    }

    /// Remove a value, as the infrastructure would on destruction.
    pub fn remove(&self, path: &str) {
        self.inner
            .values
            .lock()
            .expect("store lock poisoned")
            .remove(path);
    }

    pub fn get(&self, path: &str) -> Option<String> {
        self.inner
            .values
            .lock()
            .expect("store lock poisoned")
            .get(path)
            .map(|(value, _)| value.clone())
    }

    /// Every stored value, in no particular order.
    pub fn values(&self) -> Vec<String> {
        self.inner
            .values
            .lock()
            .expect("store lock poisoned")
            .values()
            .map(|(value, _)| value.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.values.lock().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `put_parameter` calls, successful or not.
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ParameterStore for InMemoryParameterStore {
    async fn put_parameter(&self, path: &str, value: &str) -> Result<ParameterAck, CloudError> {
        self.inner.writes.fetch_add(1, Ordering::SeqCst);

        if self.inner.fail_writes {
            return Err(CloudError::Store {
                path: path.to_string(),
                message: "mock store rejects writes".to_string(),
            });
        }

        self.seed(path, value);
        let version = self
            .inner
            .values
            .lock()
            .expect("store lock poisoned")
            .get(path)
            .map_or(1, |(_, v)| *v);

        Ok(ParameterAck {
            path: path.to_string(),
            version,
        })
    }
}
