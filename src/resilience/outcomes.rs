//! Outcome aggregation for reporting.
//!
//! # Responsibilities
//! - Maintain lifetime call counters (total, success, failure, rejected)
//! - Keep a bounded reporting window and a latency ring
//! - Produce point-in-time snapshots and a serialized export
//!
//! # Design Decisions
//! - Lifetime totals are O(1) counters; only `reset` zeroes them
//! - Average latency covers the latency ring only, not the whole lifetime,
//!   so memory and export cost stay bounded by the ring size
//! - Snapshots are owned values; two calls never alias each other

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::resilience::history::{BoundedHistory, HistoryError, OutcomeRecord};
use crate::resilience::state::CircuitState;

/// Point-in-time view of a breaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub state: CircuitState,
    pub total_calls: u64,
    pub success_count: u64,
    pub failure_count: u64,
    /// Calls denied without invoking the operation. Not part of `total_calls`.
    pub rejected_count: u64,
    /// `failure_count / total_calls`, 0 before the first call.
    pub failure_rate: f64,
    /// Mean latency over the latency ring, in milliseconds.
    pub average_latency_ms: f64,
    /// Unix epoch milliseconds of the last state change.
    pub last_transition_time: u64,
    /// Unix epoch milliseconds at which a probe is admitted; only while open.
    pub next_probe_time: Option<u64>,
}

/// Snapshot stamped with the time it was exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsExport {
    pub exported_at: u64,
    #[serde(flatten)]
    pub snapshot: MetricsSnapshot,
}

/// Failure rate over the bounded reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    pub capacity: usize,
    pub current_count: usize,
    pub window_failure_rate: f64,
}

#[derive(Debug, Clone)]
pub struct OutcomeAggregator {
    total_calls: u64,
    success_count: u64,
    failure_count: u64,
    rejected_count: u64,
    window: BoundedHistory<OutcomeRecord>,
    latencies: BoundedHistory<Duration>,
}

impl OutcomeAggregator {
    pub fn new(config: &BreakerConfig) -> Result<Self, HistoryError> {
        Ok(Self {
            total_calls: 0,
            success_count: 0,
            failure_count: 0,
            rejected_count: 0,
            window: BoundedHistory::new(config.reporting_window_size)?,
            latencies: BoundedHistory::new(config.latency_sample_size)?,
        })
    }

    pub fn record_success(&mut self, at: Instant, latency: Duration) {
        self.total_calls += 1;
        self.success_count += 1;
        self.window.add(OutcomeRecord::success(at, latency));
        self.latencies.add(latency);
    }

    pub fn record_failure(&mut self, at: Instant, latency: Duration) {
        self.total_calls += 1;
        self.failure_count += 1;
        self.window.add(OutcomeRecord::failure(at, latency));
        self.latencies.add(latency);
    }

    /// A failed call the classifier chose not to count. Reported as a
    /// failure, but the window records that it did not count.
    pub fn record_ignored_failure(&mut self, at: Instant, latency: Duration) {
        self.total_calls += 1;
        self.failure_count += 1;
        self.window.add(OutcomeRecord::ignored_failure(at, latency));
        self.latencies.add(latency);
    }

    pub fn record_rejection(&mut self) {
        self.rejected_count += 1;
    }

    pub fn total_calls(&self) -> u64 {
        self.total_calls
    }

    pub fn average_latency(&self) -> Duration {
        if self.latencies.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.latencies.iter().sum();
        sum / self.latencies.len() as u32
    }

    pub fn snapshot(
        &self,
        state: CircuitState,
        last_transition_time: u64,
        next_probe_time: Option<u64>,
    ) -> MetricsSnapshot {
        let failure_rate = if self.total_calls == 0 {
            0.0
        } else {
            self.failure_count as f64 / self.total_calls as f64
        };

        MetricsSnapshot {
            state,
            total_calls: self.total_calls,
            success_count: self.success_count,
            failure_count: self.failure_count,
            rejected_count: self.rejected_count,
            failure_rate,
            average_latency_ms: self.average_latency().as_micros() as f64 / 1000.0,
            last_transition_time,
            next_probe_time,
        }
    }

    /// Serialize a snapshot together with its export time.
    pub fn export(
        &self,
        state: CircuitState,
        last_transition_time: u64,
        next_probe_time: Option<u64>,
        exported_at: u64,
    ) -> Result<String, serde_json::Error> {
        let export = MetricsExport {
            exported_at,
            snapshot: self.snapshot(state, last_transition_time, next_probe_time),
        };
        serde_json::to_string(&export)
    }

    pub fn window_stats(&self) -> WindowStats {
        let current_count = self.window.len();
        let failures = self.window.iter().filter(|r| !r.succeeded).count();
        let window_failure_rate = if current_count == 0 {
            0.0
        } else {
            failures as f64 / current_count as f64
        };

        WindowStats {
            capacity: self.window.capacity(),
            current_count,
            window_failure_rate,
        }
    }

    pub fn reset(&mut self) {
        self.total_calls = 0;
        self.success_count = 0;
        self.failure_count = 0;
        self.rejected_count = 0;
        self.window.clear();
        self.latencies.clear();
    }
}
