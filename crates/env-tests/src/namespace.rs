//! Unique namespaces for concurrent scenario runs.
//!
//! Every scenario derives its environment name and parameter path from a
//! fresh run ID, so two scenarios never address the same infrastructure stack
//! or parameter store entry.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Number of random hex characters in a run ID.
const RANDOM_LEN: usize = 10;

/// Process-wide sequence appended to the random part.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate a lowercase, collision-resistant run ID.
///
/// The random prefix separates processes; the sequence suffix guarantees
/// that IDs generated within one process are pairwise distinct.
pub fn unique_id() -> String {
    let random = Uuid::new_v4().simple().to_string();
    let prefix = random.get(..RANDOM_LEN).unwrap_or(&random);
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}{seq:x}")
}

/// The identifiers isolating one scenario's external state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub run_id: String,
    pub environment: String,
    pub parameter_path: String,
}

impl Namespace {
    /// Derive a namespace for `project` from a fresh run ID.
    ///
    /// Produces environment `<prefix>-<run_id>` and parameter path
    /// `/<project>/<environment>/dynamic_string`.
    pub fn generate(project: &str, prefix: &str) -> Self {
        Self::from_run_id(project, prefix, unique_id())
    }

    /// Derive a namespace from an explicit run ID.
    pub fn from_run_id(project: &str, prefix: &str, run_id: impl Into<String>) -> Self {
        let run_id = run_id.into();
        let environment = format!("{prefix}-{run_id}");
        let parameter_path = format!("/{project}/{environment}/dynamic_string");
        Self {
            run_id,
            environment,
            parameter_path,
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.environment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_unique_id_is_lowercase_alphanumeric() {
        let id = unique_id();
        assert!(id.len() > RANDOM_LEN);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_unique_ids_never_collide() {
        let ids: HashSet<String> = (0..10_000).map(|_| unique_id()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_unique_ids_across_threads() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| (0..1000).map(|_| unique_id()).collect::<Vec<_>>()))
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().expect("thread panicked") {
                assert!(seen.insert(id), "duplicate id generated");
            }
        }
    }

    #[test]
    fn test_namespace_derivation() {
        let ns = Namespace::from_run_id("dynamic-string-service", "test", "abc123");
        assert_eq!(ns.environment, "test-abc123");
        assert_eq!(
            ns.parameter_path,
            "/dynamic-string-service/test-abc123/dynamic_string"
        );
        assert_eq!(ns.to_string(), "test-abc123");
    }

    #[test]
    fn test_generated_namespaces_are_disjoint() {
        let a = Namespace::generate("dynamic-string-service", "test");
        let b = Namespace::generate("dynamic-string-service", "test");
        assert_ne!(a.environment, b.environment);
        assert_ne!(a.parameter_path, b.parameter_path);
    }
}
