//! Deadline, failure and critical-provider handling under a paused clock.

use std::time::Duration;

use arbiter_core::{GrantState, VerdictFailure};
use arbiter_engine::ResolutionError;
use arbiter_test::{MockProvider, TestHarness, test_context};
use tokio::time::Instant;

const DEADLINE: Duration = Duration::from_millis(100);

#[tokio::test(start_paused = true)]
async fn test_late_provider_is_undefined() {
    let user = MockProvider::new("User").with_state(GrantState::Granted);
    // A late prohibition is discarded, not honoured.
    let tenant = MockProvider::new("Tenant")
        .with_state(GrantState::Prohibited)
        .with_delay(Duration::from_secs(5));
    let harness = TestHarness::builder()
        .with_provider(user)
        .with_provider(tenant)
        .with_check_deadline(DEADLINE)
        .build();

    let started = Instant::now();
    let result = harness.engine.check("Orders.Create", &test_context()).await.unwrap();

    assert!(result.granted);
    assert!(started.elapsed() < Duration::from_secs(1));
    let late = result.verdict_of("Tenant").unwrap();
    assert_eq!(late.state, GrantState::Undefined);
    assert_eq!(late.failure, Some(VerdictFailure::TimedOut { budget_ms: 100 }));
    assert_eq!(result.failures().count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_is_shared_not_per_provider() {
    let a = MockProvider::new("A")
        .with_state(GrantState::Granted)
        .with_delay(Duration::from_millis(80));
    let b = MockProvider::new("B").with_delay(Duration::from_millis(80));
    let c = MockProvider::new("C").with_delay(Duration::from_millis(80));
    let harness = TestHarness::builder()
        .with_provider(a)
        .with_provider(b)
        .with_provider(c)
        .with_check_deadline(DEADLINE)
        .build();

    let started = Instant::now();
    let result = harness.engine.check("Orders.Create", &test_context()).await.unwrap();
    let elapsed = started.elapsed();

    // Providers run concurrently: three 80ms answers fit a 100ms budget.
    assert!(result.granted);
    assert_eq!(result.failures().count(), 0);
    assert!(elapsed >= Duration::from_millis(80));
    assert!(elapsed < DEADLINE);
}

#[tokio::test(start_paused = true)]
async fn test_critical_timeout_fails_check_and_is_not_cached() {
    let user = MockProvider::new("User").with_state(GrantState::Granted);
    let tenant = MockProvider::new("Tenant").with_delay(Duration::from_secs(5));
    let harness = TestHarness::builder()
        .with_provider(user.clone())
        .with_critical_provider(tenant.clone())
        .with_check_deadline(DEADLINE)
        .build();

    for _ in 0..2 {
        let err = harness
            .engine
            .check("Orders.Create", &test_context())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ResolutionError::ProviderTimeout {
                provider: "Tenant".into(),
                budget_ms: 100,
            }
        );
    }
    assert_eq!(tenant.calls(), 2);
    assert_eq!(user.calls(), 2);
    assert!(harness.engine.cache().unwrap().is_empty());
}

#[tokio::test]
async fn test_failing_provider_is_absorbed() {
    let user = MockProvider::new("User").with_state(GrantState::Granted);
    let tenant = MockProvider::new("Tenant").failing("connection refused");
    let harness = TestHarness::builder()
        .with_provider(user)
        .with_provider(tenant)
        .build();

    let result = harness.engine.check("Orders.Create", &test_context()).await.unwrap();
    assert!(result.granted);
    let failed = result.verdict_of("Tenant").unwrap();
    assert!(matches!(
        &failed.failure,
        Some(VerdictFailure::Failed { reason }) if reason.contains("connection refused")
    ));
}

#[tokio::test]
async fn test_failing_critical_provider_fails_check() {
    let user = MockProvider::new("User").with_state(GrantState::Granted);
    let tenant = MockProvider::new("Tenant").failing("connection refused");
    let harness = TestHarness::builder()
        .with_provider(user)
        .with_critical_provider(tenant)
        .build();

    let err = harness
        .engine
        .check("Orders.Create", &test_context())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ResolutionError::CriticalProviderFailure { provider, reason }
            if provider == "Tenant" && reason.contains("connection refused")
    ));
}

#[tokio::test]
async fn test_panicking_provider_is_a_failure() {
    let user = MockProvider::new("User").with_state(GrantState::Granted);
    let broken = MockProvider::new("Broken").panicking("index out of bounds");
    let harness = TestHarness::builder()
        .with_provider(user)
        .with_provider(broken)
        .build();

    let result = harness.engine.check("Orders.Create", &test_context()).await.unwrap();
    assert!(result.granted);
    let failed = result.verdict_of("Broken").unwrap();
    assert!(matches!(
        &failed.failure,
        Some(VerdictFailure::Failed { reason }) if reason.contains("index out of bounds")
    ));
}

#[tokio::test(start_paused = true)]
async fn test_late_providers_do_not_block_critical_success() {
    let policy = MockProvider::new("Policy").with_state(GrantState::Granted);
    let slow = MockProvider::new("Audit").with_delay(Duration::from_secs(30));
    let harness = TestHarness::builder()
        .with_critical_provider(policy)
        .with_provider(slow)
        .with_check_deadline(DEADLINE)
        .build();

    let started = Instant::now();
    let result = harness.engine.check("Orders.Create", &test_context()).await.unwrap();
    assert!(result.granted);
    assert!(started.elapsed() <= Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn test_late_feature_gate_on_silence_denies_without_error() {
    let role = MockProvider::new("Role");
    let feature = MockProvider::new("Feature")
        .with_state(GrantState::Granted)
        .with_delay(Duration::from_secs(1));
    let harness = TestHarness::builder()
        .with_provider(role)
        .with_provider(feature)
        .with_check_deadline(DEADLINE)
        .build();

    let result = harness.engine.check("Orders.Create", &test_context()).await.unwrap();
    assert!(!result.granted);
    assert_eq!(result.decision, GrantState::Undefined);
    assert!(result.verdict_of("Feature").unwrap().is_failure());
}
