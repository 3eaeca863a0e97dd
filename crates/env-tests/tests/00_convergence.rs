//! Convergence verifier properties.
//!
//! Runs on a paused clock, so waits are asserted exactly without sleeping.

use dss_test_utils::{render, ScriptedObserver};
use env_tests::eventual::{verify_convergence, LastObservation, RetryPolicy};
use env_tests::observe::{ExpectedObservation, ObserveError};
use std::time::Duration;
use tokio::time::Instant;

const INTERVAL: Duration = Duration::from_secs(5);

#[tokio::test(start_paused = true)]
async fn test_single_attempt_match_succeeds() {
    let observer = ScriptedObserver::always("v1");
    let start = Instant::now();

    let converged = verify_convergence(
        &observer,
        &ExpectedObservation::for_value("v1"),
        RetryPolicy::new(1, INTERVAL),
    )
    .await
    .expect("first observation matches");

    assert_eq!(converged.attempts, 1);
    assert_eq!(observer.calls(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_single_attempt_mismatch_fails_without_sleeping() {
    let observer = ScriptedObserver::always("v0");
    let start = Instant::now();

    let timeout = verify_convergence(
        &observer,
        &ExpectedObservation::for_value("v1"),
        RetryPolicy::new(1, INTERVAL),
    )
    .await
    .expect_err("first observation does not match");

    assert_eq!(timeout.attempts, 1);
    assert_eq!(observer.calls(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(timeout.last, LastObservation::Mismatch(render("v0")));
}

#[tokio::test(start_paused = true)]
async fn test_succeeds_on_kth_attempt_after_k_minus_one_intervals() {
    for k in 1..=10u32 {
        let observer = ScriptedObserver::matching_on(k as usize, "v0", "v1");
        let start = Instant::now();

        let converged = verify_convergence(
            &observer,
            &ExpectedObservation::for_value("v1"),
            RetryPolicy::new(10, INTERVAL),
        )
        .await
        .unwrap_or_else(|e| panic!("k={k} should converge: {e}"));

        assert_eq!(converged.attempts, k);
        assert_eq!(observer.calls(), k as usize);
        assert_eq!(start.elapsed(), INTERVAL * (k - 1), "k={k}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_budget_waits_between_attempts_only() {
    let observer = ScriptedObserver::always("v0");
    let policy = RetryPolicy::new(15, Duration::from_secs(4));
    let start = Instant::now();

    let timeout = verify_convergence(&observer, &ExpectedObservation::for_value("v1"), policy)
        .await
        .expect_err("never matches");

    assert_eq!(timeout.attempts, 15);
    assert_eq!(start.elapsed(), Duration::from_secs(4 * 14));
    assert!(start.elapsed() <= policy.total_wait_bound());
}

#[tokio::test(start_paused = true)]
async fn test_invoke_error_on_final_attempt_is_distinct_from_mismatch() {
    let observer = ScriptedObserver::new(vec![
        Ok(render("v0")),
        Err(ObserveError::Invoke("ResourceNotFoundException".to_string())),
    ]);

    let timeout = verify_convergence(
        &observer,
        &ExpectedObservation::for_value("v1"),
        RetryPolicy::new(2, INTERVAL),
    )
    .await
    .expect_err("never matches");

    assert_eq!(
        timeout.last,
        LastObservation::Failed(ObserveError::Invoke(
            "ResourceNotFoundException".to_string()
        ))
    );
    assert!(timeout.to_string().contains("ResourceNotFoundException"));
}

#[tokio::test(start_paused = true)]
async fn test_errors_before_match_are_retried() {
    let observer = ScriptedObserver::new(vec![
        Err(ObserveError::Request("connection refused".to_string())),
        Err(ObserveError::UnexpectedStatus {
            status: 502,
            body: "Bad Gateway".to_string(),
        }),
        Ok(render("v1")),
    ]);

    let converged = verify_convergence(
        &observer,
        &ExpectedObservation::for_value("v1"),
        RetryPolicy::new(5, INTERVAL),
    )
    .await
    .expect("errors are retryable");

    assert_eq!(converged.attempts, 3);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_invoke_error_exhausts_budget() {
    let error = ObserveError::Invoke("Unhandled: KeyError".to_string());
    let observer = ScriptedObserver::failing(error.clone());
    let start = Instant::now();

    let timeout = verify_convergence(
        &observer,
        &ExpectedObservation::for_value("v1"),
        RetryPolicy::new(3, INTERVAL),
    )
    .await
    .expect_err("never matches");

    assert_eq!(timeout.attempts, 3);
    assert_eq!(observer.calls(), 3);
    assert_eq!(start.elapsed(), INTERVAL * 2);
    assert_eq!(timeout.last, LastObservation::Failed(error));
}
