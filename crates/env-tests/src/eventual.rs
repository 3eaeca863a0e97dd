//! Convergence verification for asynchronously propagated configuration.
//!
//! A parameter write is acknowledged immediately but shows up in the service
//! output some time later. [`verify_convergence`] polls an [`Observer`] at a
//! fixed interval until the expected fragment appears or the attempt budget
//! runs out. Total wait is bounded by `max_attempts × interval`.

use crate::observe::{ExpectedObservation, ObserveError, Observer};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Longest body snippet kept in a timeout diagnostic.
const MAX_DIAGNOSTIC_CHARS: usize = 512;

/// Categories of eventual consistency with their retry budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyCategory {
    /// First read after provisioning (10 attempts, 5s apart).
    ColdRead,

    /// Parameter update reaching the service output (15 attempts, 4s apart).
    ConfigPropagation,
}

impl ConsistencyCategory {
    /// Default retry policy for this category.
    pub fn policy(&self) -> RetryPolicy {
        match self {
            ConsistencyCategory::ColdRead => RetryPolicy::new(10, Duration::from_secs(5)),
            ConsistencyCategory::ConfigPropagation => RetryPolicy::new(15, Duration::from_secs(4)),
        }
    }
}

/// Fixed-interval retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Upper bound on the time spent waiting under this policy.
    pub fn total_wait_bound(&self) -> Duration {
        self.interval * self.max_attempts
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// The last thing seen before giving up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LastObservation {
    /// The service answered, but without the expected fragment.
    Mismatch(String),
    /// The observation itself failed.
    Failed(ObserveError),
}

impl fmt::Display for LastObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LastObservation::Mismatch(body) => write!(f, "body {body:?}"),
            LastObservation::Failed(ObserveError::UnexpectedStatus { status, body }) => {
                write!(f, "status {status} with body {body:?}")
            }
            LastObservation::Failed(e) => write!(f, "error: {e}"),
        }
    }
}

/// The expected fragment never appeared within the retry budget.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{expected:?} not observed after {attempts} attempts; last {last}")]
pub struct VerificationTimeout {
    pub expected: String,
    pub attempts: u32,
    pub last: LastObservation,
}

/// Successful convergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Converged {
    /// Attempt on which the match was observed (1-based).
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Poll `observer` until its output contains `expected` or `policy` is exhausted.
///
/// Returns on the first match without further waiting. Between unsuccessful
/// attempts the task sleeps for exactly `policy.interval`; there is no sleep
/// after the final attempt.
pub async fn verify_convergence(
    observer: &dyn Observer,
    expected: &ExpectedObservation,
    policy: RetryPolicy,
) -> Result<Converged, VerificationTimeout> {
    let max_attempts = policy.attempts();
    let start = Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;

        let last = match observer.observe().await {
            Ok(body) if expected.matches(&body) => {
                info!(
                    target: "env_tests.eventual",
                    target_desc = %observer.describe(),
                    attempt,
                    "Expected output observed"
                );
                return Ok(Converged {
                    attempts: attempt,
                    elapsed: start.elapsed(),
                });
            }
            Ok(body) => LastObservation::Mismatch(truncate(&body, MAX_DIAGNOSTIC_CHARS)),
            Err(ObserveError::UnexpectedStatus { status, body }) => {
                LastObservation::Failed(ObserveError::UnexpectedStatus {
                    status,
                    body: truncate(&body, MAX_DIAGNOSTIC_CHARS),
                })
            }
            Err(e) => LastObservation::Failed(e),
        };

        if attempt >= max_attempts {
            warn!(
                target: "env_tests.eventual",
                target_desc = %observer.describe(),
                attempts = attempt,
                last = %last,
                "Retry budget exhausted"
            );
            return Err(VerificationTimeout {
                expected: expected.fragment().to_string(),
                attempts: attempt,
                last,
            });
        }

        debug!(
            target: "env_tests.eventual",
            attempt,
            max_attempts,
            last = %last,
            "Not converged yet, retrying in {:?}",
            policy.interval
        );

        sleep(policy.interval).await;
    }
}

/// First `max` characters of `text`, on a character boundary.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
