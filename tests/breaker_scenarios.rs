//! End-to-end breaker behavior.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tripwire::resilience::MetricsExport;
use tripwire::{BreakerConfig, BreakerError, CircuitBreaker, CircuitState};

mod common;

use common::{count_only_config, Invocations, Refused};

#[tokio::test(start_paused = true)]
async fn test_never_opens_below_minimum_samples() {
    for min_samples in [1u32, 4, 10] {
        let config = BreakerConfig {
            failure_count_threshold: 1,
            failure_rate_threshold: 0.0,
            minimum_sample_size: min_samples,
            ..BreakerConfig::default()
        };
        let cb = CircuitBreaker::new("guard", config).unwrap();
        let calls = Invocations::default();

        for _ in 0..min_samples - 1 {
            calls.fail(&cb).await;
            assert_eq!(cb.state(), CircuitState::Closed);
        }
        calls.fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);
    }
}

#[tokio::test(start_paused = true)]
async fn test_kth_failure_opens_not_k_minus_one() {
    let k = 4;
    let cb = CircuitBreaker::new("count", count_only_config(k, 4, 1_000)).unwrap();
    let calls = Invocations::default();

    // Successes keep the rate below 1.0 so only the count can trip.
    calls.succeed(&cb).await.unwrap();
    calls.succeed(&cb).await.unwrap();

    for _ in 0..k - 1 {
        calls.fail(&cb).await;
    }
    assert_eq!(cb.state(), CircuitState::Closed);

    calls.fail(&cb).await;
    assert_eq!(cb.state(), CircuitState::Open);
}

#[tokio::test(start_paused = true)]
async fn test_rate_threshold_opens() {
    let config = BreakerConfig {
        failure_count_threshold: 100,
        failure_rate_threshold: 0.5,
        minimum_sample_size: 4,
        ..BreakerConfig::default()
    };
    let cb = CircuitBreaker::new("rate", config).unwrap();
    let calls = Invocations::default();

    calls.succeed(&cb).await.unwrap();
    calls.fail(&cb).await;
    calls.succeed(&cb).await.unwrap();
    assert_eq!(cb.state(), CircuitState::Closed);

    calls.fail(&cb).await;
    assert_eq!(cb.state(), CircuitState::Open);
}

#[tokio::test(start_paused = true)]
async fn test_open_rejects_without_invoking() {
    let cb = CircuitBreaker::new("reject", count_only_config(2, 2, 100)).unwrap();
    let calls = Invocations::default();
    calls.fail(&cb).await;
    calls.fail(&cb).await;
    assert_eq!(calls.count(), 2);

    for _ in 0..5 {
        let err = calls.succeed(&cb).await.unwrap_err();
        assert!(err.is_circuit_open());
    }
    assert_eq!(calls.count(), 2);
    assert_eq!(cb.metrics().rejected_count, 5);
}

#[tokio::test(start_paused = true)]
async fn test_probe_enters_half_open_first_and_runs_once() {
    let cb = CircuitBreaker::new("probe", count_only_config(2, 2, 100)).unwrap();
    let calls = Invocations::default();
    calls.fail(&cb).await;
    calls.fail(&cb).await;

    time::sleep(Duration::from_millis(100)).await;

    let saw_half_open = Arc::new(AtomicBool::new(false));
    let seen = saw_half_open.clone();
    let probe = cb.clone();
    let invoked = Arc::new(AtomicU32::new(0));
    let counter = invoked.clone();
    cb.execute(|| async move {
        counter.fetch_add(1, Ordering::SeqCst);
        seen.store(probe.state() == CircuitState::HalfOpen, Ordering::SeqCst);
        Ok::<_, Refused>(())
    })
    .await
    .unwrap();

    assert_eq!(invoked.load(Ordering::SeqCst), 1);
    assert!(saw_half_open.load(Ordering::SeqCst));
    assert_eq!(cb.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_failed_probe_reopens_and_restarts_delay() {
    let cb = CircuitBreaker::new("reprobe", count_only_config(2, 2, 100)).unwrap();
    let calls = Invocations::default();
    calls.fail(&cb).await;
    calls.fail(&cb).await;
    let first_open = cb.metrics().next_probe_time.unwrap();

    time::sleep(Duration::from_millis(120)).await;
    calls.fail(&cb).await;
    assert_eq!(cb.state(), CircuitState::Open);

    let second_open = cb.metrics().next_probe_time.unwrap();
    assert_eq!(second_open, first_open + 120);

    time::sleep(Duration::from_millis(90)).await;
    assert!(calls.succeed(&cb).await.unwrap_err().is_circuit_open());

    time::sleep(Duration::from_millis(10)).await;
    calls.succeed(&cb).await.unwrap();
    assert_eq!(cb.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_reset_from_any_state() {
    let cb = CircuitBreaker::new("reset", count_only_config(2, 2, 100)).unwrap();
    let calls = Invocations::default();

    // Closed with history.
    calls.succeed(&cb).await.unwrap();
    cb.reset();
    assert_eq!(cb.state(), CircuitState::Closed);
    assert_eq!(cb.metrics().total_calls, 0);

    // Open.
    calls.fail(&cb).await;
    calls.fail(&cb).await;
    assert_eq!(cb.state(), CircuitState::Open);
    cb.reset();
    assert_eq!(cb.state(), CircuitState::Closed);
    assert_eq!(cb.metrics().total_calls, 0);
    assert_eq!(cb.consecutive_failures(), 0);

    // Evaluator history is gone too: one failure does not reopen.
    calls.fail(&cb).await;
    assert_eq!(cb.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_reset_is_idempotent() {
    let cb = CircuitBreaker::new("idem", count_only_config(2, 2, 100)).unwrap();
    let calls = Invocations::default();
    calls.fail(&cb).await;
    calls.fail(&cb).await;

    cb.reset();
    let once = cb.metrics();
    let window_once = cb.window_stats();

    cb.reset();
    let twice = cb.metrics();

    assert_eq!(once.state, twice.state);
    assert_eq!(once.total_calls, twice.total_calls);
    assert_eq!(once.failure_count, twice.failure_count);
    assert_eq!(once.last_transition_time, twice.last_transition_time);
    assert_eq!(window_once, cb.window_stats());
}

#[tokio::test(start_paused = true)]
async fn test_export_round_trip_matches_metrics() {
    let cb = CircuitBreaker::new("export", count_only_config(2, 2, 100)).unwrap();
    let calls = Invocations::default();
    calls.succeed(&cb).await.unwrap();
    calls.fail(&cb).await;
    calls.fail(&cb).await;

    let snapshot = cb.metrics();
    let exported: MetricsExport = serde_json::from_str(&cb.export_metrics().unwrap()).unwrap();

    assert_eq!(exported.snapshot.total_calls, snapshot.total_calls);
    assert_eq!(exported.snapshot.success_count, snapshot.success_count);
    assert_eq!(exported.snapshot.failure_count, snapshot.failure_count);
    assert_eq!(exported.snapshot.state, snapshot.state);
    assert_eq!(exported.snapshot.state, CircuitState::Open);
    assert!(exported.exported_at >= snapshot.last_transition_time);
}

#[tokio::test(start_paused = true)]
async fn test_scenario_open_reject_recover() {
    let config = BreakerConfig {
        failure_count_threshold: 3,
        minimum_sample_size: 3,
        open_to_probe_delay_ms: 100,
        ..BreakerConfig::default()
    };
    let cb = CircuitBreaker::new("scenario", config).unwrap();
    let calls = Invocations::default();

    for _ in 0..3 {
        calls.fail(&cb).await;
    }
    assert_eq!(cb.state(), CircuitState::Open);

    time::sleep(Duration::from_millis(50)).await;
    let err = calls.succeed(&cb).await.unwrap_err();
    match err {
        BreakerError::CircuitOpen(open) => assert_eq!(open.retry_after, Duration::from_millis(50)),
        other => panic!("expected CircuitOpen, got {:?}", other),
    }

    time::sleep(Duration::from_millis(100)).await;
    calls.succeed(&cb).await.unwrap();
    assert_eq!(cb.state(), CircuitState::Closed);
    assert_eq!(cb.metrics().total_calls, 4);
}

#[tokio::test(start_paused = true)]
async fn test_scenario_slow_operation_times_out_once() {
    let config = BreakerConfig {
        operation_timeout_ms: 50,
        ..BreakerConfig::default()
    };
    let cb = CircuitBreaker::new("slow", config).unwrap();

    // The dependency keeps running on its own task after the breaker gives up.
    let finished = Arc::new(AtomicBool::new(false));
    let done = finished.clone();
    let task = tokio::spawn(async move {
        time::sleep(Duration::from_millis(200)).await;
        done.store(true, Ordering::SeqCst);
    });
    let err = cb
        .execute(|| async move { task.await.map_err(|_| Refused) })
        .await
        .unwrap_err();

    match err {
        BreakerError::Timeout { after } => assert_eq!(after, Duration::from_millis(50)),
        other => panic!("expected Timeout, got {:?}", other),
    }

    time::sleep(Duration::from_millis(300)).await;
    assert!(finished.load(Ordering::SeqCst));
    assert_eq!(cb.metrics().failure_count, 1);
    assert_eq!(cb.metrics().total_calls, 1);
}

#[tokio::test(start_paused = true)]
async fn test_operation_error_passes_through() {
    let cb = CircuitBreaker::new("passthrough", BreakerConfig::default()).unwrap();
    let calls = Invocations::default();

    let err = calls.fail(&cb).await;
    assert_eq!(err.into_operation_error(), Some(Refused));
}

#[tokio::test(start_paused = true)]
async fn test_latency_reported() {
    let cb = CircuitBreaker::new("latency", BreakerConfig::default()).unwrap();
    let calls = Invocations::default();

    calls.slow(&cb, Duration::from_millis(10)).await.unwrap();
    calls.slow(&cb, Duration::from_millis(30)).await.unwrap();

    let avg = cb.metrics().average_latency_ms;
    assert!((20.0..25.0).contains(&avg), "average latency {avg}");
}
