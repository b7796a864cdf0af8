//! Synthetic flaky dependency.
//!
//! # Responsibilities
//! - Produce calls with random latency and random failures
//! - Drive them through a breaker and tally what happened
//!
//! # Design Decisions
//! - Seedable RNG so runs are reproducible in tests
//! - Stopping mid-call drops the in-flight call; the breaker books it itself

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::time;

use crate::config::SimulationConfig;
use crate::resilience::{BreakerError, CircuitBreaker};

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("simulated dependency failure")]
pub struct SimulatedFailure;

/// Dependency that fails with a fixed probability.
#[derive(Debug)]
pub struct FlakyDependency {
    rng: fastrand::Rng,
    failure_probability: f64,
    min_latency_ms: u64,
    max_latency_ms: u64,
}

impl FlakyDependency {
    pub fn new(config: &SimulationConfig) -> Self {
        Self::with_rng(config, fastrand::Rng::new())
    }

    pub fn with_seed(config: &SimulationConfig, seed: u64) -> Self {
        Self::with_rng(config, fastrand::Rng::with_seed(seed))
    }

    fn with_rng(config: &SimulationConfig, rng: fastrand::Rng) -> Self {
        Self {
            rng,
            failure_probability: config.failure_probability,
            min_latency_ms: config.min_latency_ms,
            max_latency_ms: config.max_latency_ms.max(config.min_latency_ms),
        }
    }

    /// Decide this call's latency and outcome now; the future only waits.
    pub fn call(&mut self) -> impl Future<Output = Result<(), SimulatedFailure>> {
        let latency = Duration::from_millis(self.rng.u64(self.min_latency_ms..=self.max_latency_ms));
        let fails = self.rng.f64() < self.failure_probability;

        async move {
            time::sleep(latency).await;
            if fails {
                Err(SimulatedFailure)
            } else {
                Ok(())
            }
        }
    }
}

/// Tally of a simulation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SimulationReport {
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub rejected: u64,
    /// Whether the run was cut short by `shutdown`.
    pub interrupted: bool,
}

/// Run `config.calls` calls through `breaker`, stopping early if `shutdown` resolves.
pub async fn run<S>(
    breaker: &CircuitBreaker,
    dependency: &mut FlakyDependency,
    config: &SimulationConfig,
    shutdown: S,
) -> SimulationReport
where
    S: Future<Output = ()>,
{
    let mut report = SimulationReport::default();
    let interval = Duration::from_millis(config.interval_ms);
    tokio::pin!(shutdown);

    for _ in 0..config.calls {
        let result = tokio::select! {
            _ = &mut shutdown => {
                report.interrupted = true;
                break;
            }
            result = breaker.execute(|| dependency.call()) => result,
        };
        report.attempted += 1;

        match result {
            Ok(()) => report.succeeded += 1,
            Err(BreakerError::Operation(_)) => report.failed += 1,
            Err(BreakerError::Timeout { .. }) => report.timed_out += 1,
            Err(BreakerError::CircuitOpen(_)) => report.rejected += 1,
        }

        if !interval.is_zero() {
            time::sleep(interval).await;
        }
    }

    tracing::info!(
        breaker = %breaker.name(),
        attempted = report.attempted,
        succeeded = report.succeeded,
        failed = report.failed,
        timed_out = report.timed_out,
        rejected = report.rejected,
        interrupted = report.interrupted,
        "Simulation finished"
    );

    report
}
