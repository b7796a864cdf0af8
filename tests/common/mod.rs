//! Shared utilities for integration tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tripwire::{BreakerConfig, BreakerError, CircuitBreaker};

/// Error produced by test operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refused;

impl std::fmt::Display for Refused {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("connection refused")
    }
}

/// Config where only the count threshold can open the circuit.
#[allow(dead_code)]
pub fn count_only_config(threshold: u32, min_samples: u32, probe_delay_ms: u64) -> BreakerConfig {
    BreakerConfig {
        failure_count_threshold: threshold,
        failure_rate_threshold: 1.0,
        operation_timeout_ms: 1_000,
        open_to_probe_delay_ms: probe_delay_ms,
        minimum_sample_size: min_samples,
        ..BreakerConfig::default()
    }
}

/// Counts how many times operations were actually invoked.
#[derive(Clone, Default)]
pub struct Invocations(Arc<AtomicU32>);

#[allow(dead_code)]
impl Invocations {
    pub fn count(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    pub async fn fail(&self, cb: &CircuitBreaker) -> BreakerError<Refused> {
        let counter = self.0.clone();
        cb.execute(|| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(Refused)
        })
        .await
        .unwrap_err()
    }

    pub async fn succeed(&self, cb: &CircuitBreaker) -> Result<(), BreakerError<Refused>> {
        let counter = self.0.clone();
        cb.execute(|| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await
    }

    pub async fn slow(
        &self,
        cb: &CircuitBreaker,
        latency: Duration,
    ) -> Result<(), BreakerError<Refused>> {
        let counter = self.0.clone();
        cb.execute(|| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(latency).await;
            Ok(())
        })
        .await
    }
}
